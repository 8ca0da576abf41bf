//! SQLite schema definitions

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// Initial schema (version 1)
pub const SCHEMA: &str = r#"
-- =============================================================================
-- Infrastructure: Schema version tracking
-- =============================================================================
CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    version INTEGER NOT NULL,
    applied_at INTEGER NOT NULL,
    description TEXT
);

CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at INTEGER NOT NULL,
    checksum TEXT NOT NULL,
    execution_time_ms INTEGER,
    success INTEGER NOT NULL DEFAULT 1
);

-- =============================================================================
-- 1. Identities
-- =============================================================================
CREATE TABLE IF NOT EXISTS identities (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE CHECK(length(email) >= 3),
    name TEXT,
    image TEXT,
    role TEXT NOT NULL DEFAULT 'borrower' CHECK(role IN ('admin', 'manager', 'borrower')),
    status TEXT NOT NULL DEFAULT 'active' CHECK(status IN ('active', 'suspended')),
    suspend_reason TEXT,
    suspend_feedback TEXT,
    suspended_at INTEGER,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    last_logged_in INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_identities_role ON identities(role);

-- =============================================================================
-- 2. Loans
-- =============================================================================
CREATE TABLE IF NOT EXISTS loans (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL CHECK(length(title) >= 1),
    description TEXT NOT NULL DEFAULT '',
    category TEXT NOT NULL DEFAULT '',
    image TEXT,
    interest_rate REAL NOT NULL CHECK(interest_rate >= 0),
    max_loan_limit REAL NOT NULL CHECK(max_loan_limit > 0),
    required_documents TEXT NOT NULL DEFAULT '[]',
    emi_plans TEXT NOT NULL DEFAULT '[]',
    show_on_home INTEGER NOT NULL DEFAULT 0,
    created_by TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_loans_created ON loans(created_at DESC);

-- =============================================================================
-- 3. Loan Applications
-- =============================================================================
CREATE TABLE IF NOT EXISTS loan_applications (
    id TEXT PRIMARY KEY,
    loan_id TEXT NOT NULL,
    loan_title TEXT NOT NULL,
    user_email TEXT NOT NULL,
    loan_amount REAL NOT NULL CHECK(loan_amount > 0),
    status TEXT NOT NULL DEFAULT 'Pending' CHECK(status IN ('Pending', 'Approved', 'Rejected')),
    application_fee_status TEXT NOT NULL DEFAULT 'Unpaid' CHECK(application_fee_status IN ('Unpaid', 'Paid')),
    approved_at INTEGER,
    stripe_payment_id TEXT,
    payment_email TEXT,
    payment_amount REAL,
    paid_at INTEGER,
    details TEXT NOT NULL DEFAULT '{}',
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_applications_user ON loan_applications(user_email, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_applications_status ON loan_applications(status, created_at DESC);
"#;

/// Version 2: suspended identities listing and directory search
pub const MIGRATION_V2: &str = r#"
CREATE INDEX IF NOT EXISTS idx_identities_status ON identities(status);
CREATE INDEX IF NOT EXISTS idx_identities_name ON identities(name COLLATE NOCASE)
"#;
