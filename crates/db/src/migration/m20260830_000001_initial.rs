//! Initial database migration.
//!
//! Creates all enums, tables, indexes, and triggers for the POS ledger:
//! facilities and their sellable articles, cash sessions, sales with
//! their items and payments, fiscalization logs, and sale counters.

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
        // PART 2: FACILITIES & CATALOG
        // ============================================================
        db.execute_unprepared(FACILITIES_SQL).await?;
        db.execute_unprepared(ARTICLES_SQL).await?;
        db.execute_unprepared(APPOINTMENTS_SQL).await?;

        // ============================================================
        // PART 3: CASH SESSIONS
        // ============================================================
        db.execute_unprepared(CASH_SESSIONS_SQL).await?;

        // ============================================================
        // PART 4: SALES LEDGER
        // ============================================================
        db.execute_unprepared(SALES_SQL).await?;
        db.execute_unprepared(SALE_ITEMS_SQL).await?;
        db.execute_unprepared(SALE_PAYMENTS_SQL).await?;
        db.execute_unprepared(SALE_COUNTERS_SQL).await?;

        // ============================================================
        // PART 5: FISCALIZATION
        // ============================================================
        db.execute_unprepared(FISCAL_LOGS_SQL).await?;

        // ============================================================
        // PART 6: TRIGGERS & FUNCTIONS
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

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
-- Cash session lifecycle
CREATE TYPE session_status AS ENUM (
    'open',
    'closed'
);

-- Sale lifecycle
CREATE TYPE sale_status AS ENUM (
    'final',
    'refunded',
    'partial_refund'
);

-- Fiscal receipt state machine
CREATE TYPE fiscal_status AS ENUM (
    'pending',
    'success',
    'error',
    'retry'
);

-- Configured fiscal backend per facility
CREATE TYPE fiscal_provider_kind AS ENUM (
    'none',
    'device',
    'cloud'
);

-- Tender types
CREATE TYPE payment_method AS ENUM (
    'cash',
    'card',
    'voucher',
    'gift',
    'bank',
    'other'
);

-- What a sale line refers to
CREATE TYPE sale_item_type AS ENUM (
    'service',
    'product'
);
";

const FACILITIES_SQL: &str = r"
-- Facilities (salon/clinic locations) with their fiscal configuration
CREATE TABLE facilities (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL,
    name VARCHAR(255) NOT NULL,
    fiscal_provider fiscal_provider_kind NOT NULL DEFAULT 'none',
    fiscal_retry_count INTEGER NOT NULL DEFAULT 3,
    fiscal_retry_timeout_ms BIGINT NOT NULL DEFAULT 2000,
    default_tax_rate DECIMAL(5, 2) NOT NULL DEFAULT 0,
    payment_methods JSONB NOT NULL DEFAULT '[]'::jsonb,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_fiscal_retry_count_positive CHECK (fiscal_retry_count > 0),
    CONSTRAINT chk_fiscal_retry_timeout_positive CHECK (fiscal_retry_timeout_ms > 0)
);

CREATE INDEX idx_facilities_tenant ON facilities(tenant_id);
";

const ARTICLES_SQL: &str = r"
-- Sellable retail articles with stock counts
CREATE TABLE articles (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL,
    name VARCHAR(255) NOT NULL,
    price DECIMAL(19, 4) NOT NULL DEFAULT 0,
    stock INTEGER NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_articles_stock_non_negative CHECK (stock >= 0)
);

CREATE INDEX idx_articles_tenant ON articles(tenant_id);
";

const APPOINTMENTS_SQL: &str = r"
-- Appointments, only as far as POS payment linkage is concerned
CREATE TABLE appointments (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL,
    facility_id UUID NOT NULL REFERENCES facilities(id) ON DELETE CASCADE,
    client_id UUID,
    starts_at TIMESTAMPTZ NOT NULL,
    paid BOOLEAN NOT NULL DEFAULT false,
    paid_sale_id UUID,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_appointments_tenant_facility ON appointments(tenant_id, facility_id);
";

const CASH_SESSIONS_SQL: &str = r"
-- Cash register sessions
CREATE TABLE cash_sessions (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL,
    facility_id UUID NOT NULL REFERENCES facilities(id) ON DELETE CASCADE,
    operator_id UUID NOT NULL,
    status session_status NOT NULL DEFAULT 'open',
    opening_float DECIMAL(19, 4) NOT NULL DEFAULT 0,
    total_cash DECIMAL(19, 4) NOT NULL DEFAULT 0,
    total_card DECIMAL(19, 4) NOT NULL DEFAULT 0,
    total_voucher DECIMAL(19, 4) NOT NULL DEFAULT 0,
    total_gift DECIMAL(19, 4) NOT NULL DEFAULT 0,
    total_bank DECIMAL(19, 4) NOT NULL DEFAULT 0,
    total_other DECIMAL(19, 4) NOT NULL DEFAULT 0,
    expected_cash DECIMAL(19, 4) NOT NULL DEFAULT 0,
    closing_count DECIMAL(19, 4),
    variance DECIMAL(19, 4),
    variance_action VARCHAR(50),
    variance_reason TEXT,
    note TEXT,
    closed_by UUID,
    closed_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_opening_float_non_negative CHECK (opening_float >= 0),
    CONSTRAINT chk_closed_fields CHECK (
        status = 'open' OR (closed_at IS NOT NULL AND closing_count IS NOT NULL)
    )
);

-- One open session per operator per facility; a second concurrent open
-- surfaces as a duplicate-key error on this index
CREATE UNIQUE INDEX idx_cash_sessions_one_open
    ON cash_sessions(tenant_id, facility_id, operator_id)
    WHERE status = 'open';

CREATE INDEX idx_cash_sessions_facility ON cash_sessions(tenant_id, facility_id, created_at DESC);
";

const SALES_SQL: &str = r"
-- Immutable sale rows; refunds are compensating rows, never edits
CREATE TABLE sales (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL,
    facility_id UUID NOT NULL REFERENCES facilities(id) ON DELETE CASCADE,
    session_id UUID NOT NULL REFERENCES cash_sessions(id) ON DELETE RESTRICT,
    cashier_id UUID NOT NULL,
    client_id UUID,
    appointment_id UUID REFERENCES appointments(id) ON DELETE SET NULL,
    number VARCHAR(20) NOT NULL,
    status sale_status NOT NULL DEFAULT 'final',
    subtotal DECIMAL(19, 4) NOT NULL DEFAULT 0,
    discount_total DECIMAL(19, 4) NOT NULL DEFAULT 0,
    tax_total DECIMAL(19, 4) NOT NULL DEFAULT 0,
    tip DECIMAL(19, 4) NOT NULL DEFAULT 0,
    grand_total DECIMAL(19, 4) NOT NULL DEFAULT 0,
    fiscal_status fiscal_status,
    fiscal_correlation_id UUID,
    fiscal_number VARCHAR(100),
    fiscal_error TEXT,
    fiscal_processed_at TIMESTAMPTZ,
    refund_for UUID REFERENCES sales(id) ON DELETE RESTRICT,
    refund_reason TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE UNIQUE INDEX idx_sales_number ON sales(tenant_id, facility_id, number);

-- At most one refund per original sale; a concurrent second refund
-- surfaces as a duplicate-key error on this index
CREATE UNIQUE INDEX idx_sales_one_refund
    ON sales(refund_for)
    WHERE refund_for IS NOT NULL;

CREATE INDEX idx_sales_session ON sales(session_id, created_at);
CREATE INDEX idx_sales_tenant_facility ON sales(tenant_id, facility_id, created_at DESC);
CREATE INDEX idx_sales_fiscal_pending ON sales(fiscal_status) WHERE fiscal_status IN ('pending', 'retry');
";

const SALE_ITEMS_SQL: &str = r"
-- Sale line items
CREATE TABLE sale_items (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    sale_id UUID NOT NULL REFERENCES sales(id) ON DELETE CASCADE,
    reference_id UUID NOT NULL,
    item_type sale_item_type NOT NULL,
    description VARCHAR(255) NOT NULL,
    quantity INTEGER NOT NULL,
    unit_price DECIMAL(19, 4) NOT NULL,
    discount DECIMAL(19, 4) NOT NULL DEFAULT 0,
    tax_rate DECIMAL(5, 2) NOT NULL DEFAULT 0,
    line_total DECIMAL(19, 4) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_sale_items_quantity_positive CHECK (quantity > 0)
);

CREATE INDEX idx_sale_items_sale ON sale_items(sale_id);
";

const SALE_PAYMENTS_SQL: &str = r"
-- Tenders applied to a sale
CREATE TABLE sale_payments (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    sale_id UUID NOT NULL REFERENCES sales(id) ON DELETE CASCADE,
    method payment_method NOT NULL,
    amount DECIMAL(19, 4) NOT NULL,
    change DECIMAL(19, 4),
    external_ref VARCHAR(255),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_sale_payments_amount_non_negative CHECK (amount >= 0)
);

CREATE INDEX idx_sale_payments_sale ON sale_payments(sale_id);
";

const SALE_COUNTERS_SQL: &str = r"
-- Gapless sale numbering, incremented inside the sale transaction
CREATE TABLE sale_counters (
    tenant_id UUID NOT NULL,
    facility_id UUID NOT NULL REFERENCES facilities(id) ON DELETE CASCADE,
    next_number BIGINT NOT NULL DEFAULT 1,
    PRIMARY KEY (tenant_id, facility_id)
);
";

const FISCAL_LOGS_SQL: &str = r"
-- One row per fiscalization run (a run spans all its retry attempts)
CREATE TABLE fiscal_logs (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL,
    sale_id UUID NOT NULL REFERENCES sales(id) ON DELETE CASCADE,
    correlation_id UUID NOT NULL,
    provider fiscal_provider_kind NOT NULL,
    status fiscal_status NOT NULL DEFAULT 'pending',
    retry_count INTEGER NOT NULL DEFAULT 0,
    request_payload JSONB NOT NULL,
    response_payload JSONB,
    fiscal_number VARCHAR(100),
    error TEXT,
    processed_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_fiscal_logs_sale ON fiscal_logs(sale_id, created_at DESC);
CREATE UNIQUE INDEX idx_fiscal_logs_correlation ON fiscal_logs(correlation_id);
";

const TRIGGERS_SQL: &str = r"
-- Keep updated_at current on every row update
CREATE OR REPLACE FUNCTION set_updated_at()
RETURNS TRIGGER AS $$
BEGIN
    NEW.updated_at = now();
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_facilities_updated_at
    BEFORE UPDATE ON facilities
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();

CREATE TRIGGER trg_articles_updated_at
    BEFORE UPDATE ON articles
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();

CREATE TRIGGER trg_appointments_updated_at
    BEFORE UPDATE ON appointments
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();

CREATE TRIGGER trg_cash_sessions_updated_at
    BEFORE UPDATE ON cash_sessions
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();

CREATE TRIGGER trg_sales_updated_at
    BEFORE UPDATE ON sales
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS fiscal_logs CASCADE;
DROP TABLE IF EXISTS sale_counters CASCADE;
DROP TABLE IF EXISTS sale_payments CASCADE;
DROP TABLE IF EXISTS sale_items CASCADE;
DROP TABLE IF EXISTS sales CASCADE;
DROP TABLE IF EXISTS cash_sessions CASCADE;
DROP TABLE IF EXISTS appointments CASCADE;
DROP TABLE IF EXISTS articles CASCADE;
DROP TABLE IF EXISTS facilities CASCADE;
DROP FUNCTION IF EXISTS set_updated_at CASCADE;
DROP TYPE IF EXISTS sale_item_type;
DROP TYPE IF EXISTS payment_method;
DROP TYPE IF EXISTS fiscal_provider_kind;
DROP TYPE IF EXISTS fiscal_status;
DROP TYPE IF EXISTS sale_status;
DROP TYPE IF EXISTS session_status;
";
