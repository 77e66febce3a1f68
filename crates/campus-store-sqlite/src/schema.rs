//! SQL schema for the Campus SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// Deletes cascade down the hierarchy: school → grades → students → payments.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS schools (
    school_id   TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL,
    name        TEXT NOT NULL,
    address     TEXT NOT NULL,
    phone       TEXT,
    email       TEXT,
    status      TEXT NOT NULL DEFAULT 'active',  -- 'active' | 'inactive' | 'suspended'
    debt_amount INTEGER NOT NULL DEFAULT 0 CHECK (debt_amount >= 0),
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS grades (
    grade_id      TEXT PRIMARY KEY,
    school_id     TEXT NOT NULL REFERENCES schools(school_id) ON DELETE CASCADE,
    name          TEXT NOT NULL,
    level         TEXT NOT NULL,
    academic_year TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS students (
    student_id      TEXT PRIMARY KEY,
    school_id       TEXT NOT NULL REFERENCES schools(school_id) ON DELETE CASCADE,
    grade_id        TEXT NOT NULL REFERENCES grades(grade_id) ON DELETE CASCADE,
    first_name      TEXT NOT NULL,
    last_name       TEXT NOT NULL,
    student_code    TEXT NOT NULL,
    email           TEXT,
    phone           TEXT,
    status          TEXT NOT NULL DEFAULT 'active',  -- 'active' | 'inactive'
    enrollment_date TEXT NOT NULL,                   -- YYYY-MM-DD
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    UNIQUE (grade_id, student_code)
);

CREATE TABLE IF NOT EXISTS payments (
    payment_id TEXT PRIMARY KEY,
    student_id TEXT NOT NULL REFERENCES students(student_id) ON DELETE CASCADE,
    amount     INTEGER NOT NULL CHECK (amount > 0),
    concept    TEXT NOT NULL,
    status     TEXT NOT NULL DEFAULT 'pending',  -- 'pending' | 'paid'
    due_date   TEXT NOT NULL,                    -- YYYY-MM-DD
    paid_at    TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS schools_user_idx    ON schools(user_id);
CREATE INDEX IF NOT EXISTS grades_school_idx   ON grades(school_id);
CREATE INDEX IF NOT EXISTS students_grade_idx  ON students(grade_id);
CREATE INDEX IF NOT EXISTS students_school_idx ON students(school_id);
CREATE INDEX IF NOT EXISTS payments_student_idx ON payments(student_id);

PRAGMA user_version = 1;
";
