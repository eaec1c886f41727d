//! Initial database migration.
//!
//! Creates the enums, tables, constraints and ledger triggers of the
//! expense approval workflow.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: COMPANIES AND USERS
        // ============================================================
        db.execute_unprepared(COMPANIES_SQL).await?;
        db.execute_unprepared(USERS_SQL).await?;

        // ============================================================
        // PART 3: APPROVAL RULES
        // ============================================================
        db.execute_unprepared(APPROVAL_RULES_SQL).await?;
        db.execute_unprepared(APPROVAL_STEPS_SQL).await?;

        // ============================================================
        // PART 4: EXPENSES AND LEDGER
        // ============================================================
        db.execute_unprepared(EXPENSES_SQL).await?;
        db.execute_unprepared(EXPENSE_APPROVALS_SQL).await?;
        db.execute_unprepared(AUDIT_LOGS_SQL).await?;

        // ============================================================
        // PART 5: TRIGGERS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

const ENUMS_SQL: &str = r"
CREATE TYPE user_role AS ENUM ('employee', 'manager', 'admin');
CREATE TYPE approval_rule_type AS ENUM ('sequential', 'percentage', 'specific_approver', 'hybrid');
CREATE TYPE expense_status AS ENUM ('pending', 'approved', 'rejected');
CREATE TYPE approval_status AS ENUM ('pending', 'approved', 'rejected');
";

const COMPANIES_SQL: &str = r"
CREATE TABLE companies (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL,
    currency VARCHAR(3) NOT NULL,
    country VARCHAR(100),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_company_currency CHECK (currency ~ '^[A-Z]{3}$')
);
";

const USERS_SQL: &str = r"
CREATE TABLE users (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    email VARCHAR(255) NOT NULL UNIQUE,
    first_name VARCHAR(100) NOT NULL,
    last_name VARCHAR(100) NOT NULL,
    role user_role NOT NULL DEFAULT 'employee',
    manager_id UUID REFERENCES users(id) ON DELETE SET NULL,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_not_own_manager CHECK (manager_id IS NULL OR manager_id <> id)
);

CREATE INDEX idx_users_company ON users(company_id);
CREATE INDEX idx_users_manager ON users(manager_id) WHERE manager_id IS NOT NULL;
";

const APPROVAL_RULES_SQL: &str = r"
CREATE TABLE approval_rules (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    rule_name VARCHAR(255) NOT NULL,
    is_manager_approver BOOLEAN NOT NULL DEFAULT true,
    rule_type approval_rule_type NOT NULL,
    percentage_threshold INTEGER,
    specific_approver_id UUID REFERENCES users(id) ON DELETE RESTRICT,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_threshold_range CHECK (
        percentage_threshold IS NULL OR percentage_threshold BETWEEN 1 AND 100
    ),
    CONSTRAINT chk_threshold_present CHECK (
        (rule_type IN ('percentage', 'hybrid')) = (percentage_threshold IS NOT NULL)
    ),
    CONSTRAINT chk_specific_approver_present CHECK (
        (rule_type IN ('specific_approver', 'hybrid')) = (specific_approver_id IS NOT NULL)
    )
);

CREATE INDEX idx_approval_rules_company ON approval_rules(company_id, created_at DESC)
    WHERE is_active = true;
";

const APPROVAL_STEPS_SQL: &str = r"
CREATE TABLE approval_steps (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    approval_rule_id UUID NOT NULL REFERENCES approval_rules(id) ON DELETE CASCADE,
    step_order INTEGER NOT NULL,
    approver_id UUID NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_step_order_positive CHECK (step_order >= 1),
    CONSTRAINT uq_approval_steps_order UNIQUE (approval_rule_id, step_order),
    CONSTRAINT uq_approval_steps_approver UNIQUE (approval_rule_id, approver_id)
);
";

const EXPENSES_SQL: &str = r"
CREATE TABLE expenses (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    employee_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    approval_rule_id UUID REFERENCES approval_rules(id) ON DELETE SET NULL,
    amount NUMERIC(19, 4) NOT NULL,
    currency VARCHAR(3) NOT NULL,
    converted_amount NUMERIC(19, 2) NOT NULL,
    category VARCHAR(100) NOT NULL,
    description TEXT,
    expense_date DATE NOT NULL,
    receipt_path VARCHAR(500),
    status expense_status NOT NULL DEFAULT 'pending',
    current_step INTEGER,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_amount_positive CHECK (amount > 0),
    CONSTRAINT chk_expense_currency CHECK (currency ~ '^[A-Z]{3}$'),
    CONSTRAINT chk_current_step_positive CHECK (current_step IS NULL OR current_step >= 1)
);

CREATE INDEX idx_expenses_employee ON expenses(employee_id, created_at DESC);
CREATE INDEX idx_expenses_company_status ON expenses(company_id, status, created_at DESC);
";

const EXPENSE_APPROVALS_SQL: &str = r"
CREATE TABLE expense_approvals (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    expense_id UUID NOT NULL REFERENCES expenses(id) ON DELETE CASCADE,
    approver_id UUID NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
    step_order INTEGER NOT NULL,
    status approval_status NOT NULL DEFAULT 'pending',
    comments TEXT,
    approved_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_approval_step_positive CHECK (step_order >= 1),
    CONSTRAINT chk_reject_has_comment CHECK (status <> 'rejected' OR comments IS NOT NULL),
    CONSTRAINT chk_decided_has_timestamp CHECK ((status = 'pending') = (approved_at IS NULL)),
    CONSTRAINT uq_expense_approvals_approver UNIQUE (expense_id, approver_id),
    CONSTRAINT uq_expense_approvals_step UNIQUE (expense_id, step_order)
);

CREATE INDEX idx_expense_approvals_inbox ON expense_approvals(approver_id, status);
";

const AUDIT_LOGS_SQL: &str = r"
CREATE TABLE audit_logs (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    expense_id UUID NOT NULL REFERENCES expenses(id) ON DELETE CASCADE,
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    action VARCHAR(20) NOT NULL,
    details TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_audit_action CHECK (action IN ('CREATED', 'APPROVE', 'REJECT'))
);

CREATE INDEX idx_audit_logs_expense ON audit_logs(expense_id, created_at);
";

const TRIGGERS_SQL: &str = r"
-- ============================================================
-- FUNCTION: prevent_decided_approval_modification
-- A ledger record leaves 'pending' exactly once
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_decided_approval_modification()
RETURNS TRIGGER AS $$
BEGIN
    IF OLD.status <> 'pending' THEN
        RAISE EXCEPTION 'Approval record % is already %', OLD.id, OLD.status;
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_decided_approval_mod
BEFORE UPDATE ON expense_approvals
FOR EACH ROW
EXECUTE FUNCTION prevent_decided_approval_modification();

-- ============================================================
-- FUNCTION: prevent_final_expense_modification
-- Approved and rejected expenses are terminal
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_final_expense_modification()
RETURNS TRIGGER AS $$
BEGIN
    IF OLD.status <> 'pending' AND (
        NEW.status IS DISTINCT FROM OLD.status
        OR NEW.current_step IS DISTINCT FROM OLD.current_step
    ) THEN
        RAISE EXCEPTION 'Expense % is already %', OLD.id, OLD.status;
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_final_expense_mod
BEFORE UPDATE ON expenses
FOR EACH ROW
EXECUTE FUNCTION prevent_final_expense_modification();
";

const DROP_ALL_SQL: &str = r"
DROP TRIGGER IF EXISTS trg_prevent_final_expense_mod ON expenses;
DROP TRIGGER IF EXISTS trg_prevent_decided_approval_mod ON expense_approvals;

DROP FUNCTION IF EXISTS prevent_final_expense_modification();
DROP FUNCTION IF EXISTS prevent_decided_approval_modification();

DROP TABLE IF EXISTS audit_logs CASCADE;
DROP TABLE IF EXISTS expense_approvals CASCADE;
DROP TABLE IF EXISTS expenses CASCADE;
DROP TABLE IF EXISTS approval_steps CASCADE;
DROP TABLE IF EXISTS approval_rules CASCADE;
DROP TABLE IF EXISTS users CASCADE;
DROP TABLE IF EXISTS companies CASCADE;

DROP TYPE IF EXISTS approval_status;
DROP TYPE IF EXISTS expense_status;
DROP TYPE IF EXISTS approval_rule_type;
DROP TYPE IF EXISTS user_role;
";
