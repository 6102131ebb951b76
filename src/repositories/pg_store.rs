//! Store PostgreSQL
//!
//! Cada escritura es un upsert con compare-and-swap:
//! `INSERT ... ON CONFLICT (id) DO UPDATE ... WHERE version = EXCLUDED.version - 1`.
//! Si alguna fila no se ve afectada la transacción completa se revierte y se
//! devuelve `Conflict`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::{debug, warn};
use uuid::Uuid;

use super::changeset::{Changeset, EntityWrite};
use super::WorkflowStore;
use crate::models::{
    ApprovalKind, ApprovalPriority, ApprovalRequest, ApprovalStatus, BillStatus, Contract,
    ContractStatus, ContractType, EntityKind, Holder, HoldKind, Inspection, InspectionChecklists,
    InspectionStatus, Motorcycle, MotorcycleStatus, PricingStatus, Repair, RepairBill,
    RepairStatus, Role, SellerInformation, SparePart, StatusHistoryEntry,
};
use crate::utils::errors::{version_conflict, AppError, AppResult};

#[derive(Debug, FromRow)]
struct MotorcycleRow {
    id: Uuid,
    brand: String,
    model: String,
    year: Option<i32>,
    registration_number: Option<String>,
    chassis_number: Option<String>,
    status: MotorcycleStatus,
    pricing_status: Option<PricingStatus>,
    acquisition_cost: Decimal,
    total_cost: Decimal,
    sale_price: Option<Decimal>,
    profit_margin: Option<Decimal>,
    price_in: Option<Decimal>,
    price_out: Option<Decimal>,
    profit: Option<Decimal>,
    hold_kind: Option<HoldKind>,
    hold_id: Option<Uuid>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<MotorcycleRow> for Motorcycle {
    fn from(row: MotorcycleRow) -> Self {
        let hold = match (row.hold_kind, row.hold_id) {
            (Some(kind), Some(id)) => Some(Holder { kind, id }),
            _ => None,
        };

        Self {
            id: row.id,
            brand: row.brand,
            model: row.model,
            year: row.year,
            registration_number: row.registration_number,
            chassis_number: row.chassis_number,
            status: row.status,
            pricing_status: row.pricing_status,
            acquisition_cost: row.acquisition_cost,
            total_cost: row.total_cost,
            sale_price: row.sale_price,
            profit_margin: row.profit_margin,
            price_in: row.price_in,
            price_out: row.price_out,
            profit: row.profit,
            hold,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct InspectionRow {
    id: Uuid,
    motorcycle_id: Uuid,
    contract_id: Option<Uuid>,
    customer_id: Option<Uuid>,
    workflow_status: InspectionStatus,
    seller_information: Option<Json<SellerInformation>>,
    checklists: Json<InspectionChecklists>,
    created_by: Uuid,
    rama_verified_by: Option<Uuid>,
    rama_verified_at: Option<DateTime<Utc>>,
    gidioni_verified_by: Option<Uuid>,
    gidioni_verified_at: Option<DateTime<Utc>>,
    spawned_repair_id: Option<Uuid>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<InspectionRow> for Inspection {
    fn from(row: InspectionRow) -> Self {
        Self {
            id: row.id,
            motorcycle_id: row.motorcycle_id,
            contract_id: row.contract_id,
            customer_id: row.customer_id,
            workflow_status: row.workflow_status,
            seller_information: row.seller_information.map(|j| j.0),
            checklists: row.checklists.0,
            created_by: row.created_by,
            rama_verified_by: row.rama_verified_by,
            rama_verified_at: row.rama_verified_at,
            gidioni_verified_by: row.gidioni_verified_by,
            gidioni_verified_at: row.gidioni_verified_at,
            spawned_repair_id: row.spawned_repair_id,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct RepairRow {
    id: Uuid,
    motorcycle_id: Uuid,
    mechanic_id: Option<Uuid>,
    inspection_id: Option<Uuid>,
    status: RepairStatus,
    description: String,
    work_description: Option<String>,
    issues_found: Json<Vec<String>>,
    proof_of_work: Json<Vec<String>>,
    spare_parts: Json<Vec<SparePart>>,
    labor_cost: Decimal,
    total_cost: Decimal,
    details_request_id: Option<Uuid>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RepairRow> for Repair {
    fn from(row: RepairRow) -> Self {
        Self {
            id: row.id,
            motorcycle_id: row.motorcycle_id,
            mechanic_id: row.mechanic_id,
            inspection_id: row.inspection_id,
            status: row.status,
            description: row.description,
            work_description: row.work_description,
            issues_found: row.issues_found.0,
            proof_of_work: row.proof_of_work.0,
            spare_parts: row.spare_parts.0,
            labor_cost: row.labor_cost,
            total_cost: row.total_cost,
            details_request_id: row.details_request_id,
            started_at: row.started_at,
            completed_at: row.completed_at,
            cancelled_at: row.cancelled_at,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct BillRow {
    id: Uuid,
    repair_id: Uuid,
    motorcycle_id: Uuid,
    status: BillStatus,
    labor_cost: Decimal,
    spare_parts_cost: Decimal,
    total_amount: Decimal,
    created_by: Uuid,
    payment_approved_by: Option<Uuid>,
    payment_approved_at: Option<DateTime<Utc>>,
    paid_at: Option<DateTime<Utc>>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BillRow> for RepairBill {
    fn from(row: BillRow) -> Self {
        Self {
            id: row.id,
            repair_id: row.repair_id,
            motorcycle_id: row.motorcycle_id,
            status: row.status,
            labor_cost: row.labor_cost,
            spare_parts_cost: row.spare_parts_cost,
            total_amount: row.total_amount,
            created_by: row.created_by,
            payment_approved_by: row.payment_approved_by,
            payment_approved_at: row.payment_approved_at,
            paid_at: row.paid_at,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ApprovalRow {
    id: Uuid,
    approval_type: ApprovalKind,
    status: ApprovalStatus,
    priority: ApprovalPriority,
    requested_by: Uuid,
    requested_by_role: Role,
    subject_id: Option<Uuid>,
    proposed_data: serde_json::Value,
    sales_approved_by: Option<Uuid>,
    sales_approved_at: Option<DateTime<Utc>>,
    sales_comments: Option<String>,
    admin_approved_by: Option<Uuid>,
    admin_approved_at: Option<DateTime<Utc>>,
    admin_comments: Option<String>,
    rejected_by: Option<Uuid>,
    rejected_at: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
    last_execution_error: Option<String>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ApprovalRow> for ApprovalRequest {
    fn from(row: ApprovalRow) -> Self {
        Self {
            id: row.id,
            approval_type: row.approval_type,
            status: row.status,
            priority: row.priority,
            requested_by: row.requested_by,
            requested_by_role: row.requested_by_role,
            subject_id: row.subject_id,
            proposed_data: row.proposed_data,
            sales_approved_by: row.sales_approved_by,
            sales_approved_at: row.sales_approved_at,
            sales_comments: row.sales_comments,
            admin_approved_by: row.admin_approved_by,
            admin_approved_at: row.admin_approved_at,
            admin_comments: row.admin_comments,
            rejected_by: row.rejected_by,
            rejected_at: row.rejected_at,
            rejection_reason: row.rejection_reason,
            last_execution_error: row.last_execution_error,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ContractRow {
    id: Uuid,
    contract_type: ContractType,
    motorcycle_id: Uuid,
    party_id: Uuid,
    amount: Decimal,
    status: ContractStatus,
    approval_request_id: Uuid,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ContractRow> for Contract {
    fn from(row: ContractRow) -> Self {
        Self {
            id: row.id,
            contract_type: row.contract_type,
            motorcycle_id: row.motorcycle_id,
            party_id: row.party_id,
            amount: row.amount,
            status: row.status,
            approval_request_id: row.approval_request_id,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct HistoryRow {
    id: Uuid,
    entity_kind: EntityKind,
    entity_id: Uuid,
    from_status: Option<String>,
    to_status: String,
    actor_id: Uuid,
    actor_role: Role,
    note: Option<String>,
    recorded_at: DateTime<Utc>,
}

impl From<HistoryRow> for StatusHistoryEntry {
    fn from(row: HistoryRow) -> Self {
        Self {
            id: row.id,
            entity_kind: row.entity_kind,
            entity_id: row.entity_id,
            from_status: row.from_status,
            to_status: row.to_status,
            actor_id: row.actor_id,
            actor_role: row.actor_role,
            note: row.note,
            recorded_at: row.recorded_at,
        }
    }
}

fn convert_all<R, T: From<R>>(rows: Vec<R>) -> AppResult<Vec<T>> {
    Ok(rows.into_iter().map(T::from).collect())
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn write(tx: &mut Transaction<'_, Postgres>, write: &EntityWrite) -> AppResult<u64> {
        let result = match write {
            EntityWrite::Motorcycle(m) => {
                sqlx::query(
                    r#"
                    INSERT INTO motorcycles (
                        id, brand, model, year, registration_number, chassis_number, status,
                        pricing_status, acquisition_cost, total_cost, sale_price, profit_margin,
                        price_in, price_out, profit, hold_kind, hold_id, version, created_at, updated_at
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
                    ON CONFLICT (id) DO UPDATE SET
                        brand = EXCLUDED.brand, model = EXCLUDED.model, year = EXCLUDED.year,
                        registration_number = EXCLUDED.registration_number,
                        chassis_number = EXCLUDED.chassis_number, status = EXCLUDED.status,
                        pricing_status = EXCLUDED.pricing_status,
                        acquisition_cost = EXCLUDED.acquisition_cost, total_cost = EXCLUDED.total_cost,
                        sale_price = EXCLUDED.sale_price, profit_margin = EXCLUDED.profit_margin,
                        price_in = EXCLUDED.price_in, price_out = EXCLUDED.price_out,
                        profit = EXCLUDED.profit, hold_kind = EXCLUDED.hold_kind,
                        hold_id = EXCLUDED.hold_id, version = EXCLUDED.version,
                        updated_at = EXCLUDED.updated_at
                    WHERE motorcycles.version = EXCLUDED.version - 1
                    "#,
                )
                .bind(m.id)
                .bind(&m.brand)
                .bind(&m.model)
                .bind(m.year)
                .bind(&m.registration_number)
                .bind(&m.chassis_number)
                .bind(m.status)
                .bind(m.pricing_status)
                .bind(m.acquisition_cost)
                .bind(m.total_cost)
                .bind(m.sale_price)
                .bind(m.profit_margin)
                .bind(m.price_in)
                .bind(m.price_out)
                .bind(m.profit)
                .bind(m.hold.map(|h| h.kind))
                .bind(m.hold.map(|h| h.id))
                .bind(m.version)
                .bind(m.created_at)
                .bind(m.updated_at)
                .execute(&mut **tx)
                .await?
            }
            EntityWrite::Inspection(i) => {
                sqlx::query(
                    r#"
                    INSERT INTO inspections (
                        id, motorcycle_id, contract_id, customer_id, workflow_status,
                        seller_information, checklists, created_by, rama_verified_by, rama_verified_at,
                        gidioni_verified_by, gidioni_verified_at, spawned_repair_id, version,
                        created_at, updated_at
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
                    ON CONFLICT (id) DO UPDATE SET
                        workflow_status = EXCLUDED.workflow_status,
                        seller_information = EXCLUDED.seller_information,
                        checklists = EXCLUDED.checklists,
                        rama_verified_by = EXCLUDED.rama_verified_by,
                        rama_verified_at = EXCLUDED.rama_verified_at,
                        gidioni_verified_by = EXCLUDED.gidioni_verified_by,
                        gidioni_verified_at = EXCLUDED.gidioni_verified_at,
                        spawned_repair_id = EXCLUDED.spawned_repair_id,
                        version = EXCLUDED.version, updated_at = EXCLUDED.updated_at
                    WHERE inspections.version = EXCLUDED.version - 1
                    "#,
                )
                .bind(i.id)
                .bind(i.motorcycle_id)
                .bind(i.contract_id)
                .bind(i.customer_id)
                .bind(i.workflow_status)
                .bind(i.seller_information.clone().map(Json))
                .bind(Json(i.checklists.clone()))
                .bind(i.created_by)
                .bind(i.rama_verified_by)
                .bind(i.rama_verified_at)
                .bind(i.gidioni_verified_by)
                .bind(i.gidioni_verified_at)
                .bind(i.spawned_repair_id)
                .bind(i.version)
                .bind(i.created_at)
                .bind(i.updated_at)
                .execute(&mut **tx)
                .await?
            }
            EntityWrite::Repair(r) => {
                sqlx::query(
                    r#"
                    INSERT INTO repairs (
                        id, motorcycle_id, mechanic_id, inspection_id, status, description,
                        work_description, issues_found, proof_of_work, spare_parts, labor_cost,
                        total_cost, details_request_id, started_at, completed_at, cancelled_at,
                        version, created_at, updated_at
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
                    ON CONFLICT (id) DO UPDATE SET
                        mechanic_id = EXCLUDED.mechanic_id, status = EXCLUDED.status,
                        description = EXCLUDED.description,
                        work_description = EXCLUDED.work_description,
                        issues_found = EXCLUDED.issues_found, proof_of_work = EXCLUDED.proof_of_work,
                        spare_parts = EXCLUDED.spare_parts, labor_cost = EXCLUDED.labor_cost,
                        total_cost = EXCLUDED.total_cost,
                        details_request_id = EXCLUDED.details_request_id,
                        started_at = EXCLUDED.started_at, completed_at = EXCLUDED.completed_at,
                        cancelled_at = EXCLUDED.cancelled_at, version = EXCLUDED.version,
                        updated_at = EXCLUDED.updated_at
                    WHERE repairs.version = EXCLUDED.version - 1
                    "#,
                )
                .bind(r.id)
                .bind(r.motorcycle_id)
                .bind(r.mechanic_id)
                .bind(r.inspection_id)
                .bind(r.status)
                .bind(&r.description)
                .bind(&r.work_description)
                .bind(Json(r.issues_found.clone()))
                .bind(Json(r.proof_of_work.clone()))
                .bind(Json(r.spare_parts.clone()))
                .bind(r.labor_cost)
                .bind(r.total_cost)
                .bind(r.details_request_id)
                .bind(r.started_at)
                .bind(r.completed_at)
                .bind(r.cancelled_at)
                .bind(r.version)
                .bind(r.created_at)
                .bind(r.updated_at)
                .execute(&mut **tx)
                .await?
            }
            EntityWrite::Bill(b) => {
                // los montos quedan congelados: el UPDATE no los toca
                sqlx::query(
                    r#"
                    INSERT INTO repair_bills (
                        id, repair_id, motorcycle_id, status, labor_cost, spare_parts_cost,
                        total_amount, created_by, payment_approved_by, payment_approved_at, paid_at,
                        version, created_at, updated_at
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
                    ON CONFLICT (id) DO UPDATE SET
                        status = EXCLUDED.status,
                        payment_approved_by = EXCLUDED.payment_approved_by,
                        payment_approved_at = EXCLUDED.payment_approved_at,
                        paid_at = EXCLUDED.paid_at, version = EXCLUDED.version,
                        updated_at = EXCLUDED.updated_at
                    WHERE repair_bills.version = EXCLUDED.version - 1
                    "#,
                )
                .bind(b.id)
                .bind(b.repair_id)
                .bind(b.motorcycle_id)
                .bind(b.status)
                .bind(b.labor_cost)
                .bind(b.spare_parts_cost)
                .bind(b.total_amount)
                .bind(b.created_by)
                .bind(b.payment_approved_by)
                .bind(b.payment_approved_at)
                .bind(b.paid_at)
                .bind(b.version)
                .bind(b.created_at)
                .bind(b.updated_at)
                .execute(&mut **tx)
                .await?
            }
            EntityWrite::Approval(a) => {
                sqlx::query(
                    r#"
                    INSERT INTO approval_requests (
                        id, approval_type, status, priority, requested_by, requested_by_role,
                        subject_id, proposed_data, sales_approved_by, sales_approved_at,
                        sales_comments, admin_approved_by, admin_approved_at, admin_comments,
                        rejected_by, rejected_at, rejection_reason, last_execution_error,
                        version, created_at, updated_at
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)
                    ON CONFLICT (id) DO UPDATE SET
                        status = EXCLUDED.status,
                        sales_approved_by = EXCLUDED.sales_approved_by,
                        sales_approved_at = EXCLUDED.sales_approved_at,
                        sales_comments = EXCLUDED.sales_comments,
                        admin_approved_by = EXCLUDED.admin_approved_by,
                        admin_approved_at = EXCLUDED.admin_approved_at,
                        admin_comments = EXCLUDED.admin_comments,
                        rejected_by = EXCLUDED.rejected_by, rejected_at = EXCLUDED.rejected_at,
                        rejection_reason = EXCLUDED.rejection_reason,
                        last_execution_error = EXCLUDED.last_execution_error,
                        version = EXCLUDED.version, updated_at = EXCLUDED.updated_at
                    WHERE approval_requests.version = EXCLUDED.version - 1
                    "#,
                )
                .bind(a.id)
                .bind(a.approval_type)
                .bind(a.status)
                .bind(a.priority)
                .bind(a.requested_by)
                .bind(a.requested_by_role)
                .bind(a.subject_id)
                .bind(&a.proposed_data)
                .bind(a.sales_approved_by)
                .bind(a.sales_approved_at)
                .bind(&a.sales_comments)
                .bind(a.admin_approved_by)
                .bind(a.admin_approved_at)
                .bind(&a.admin_comments)
                .bind(a.rejected_by)
                .bind(a.rejected_at)
                .bind(&a.rejection_reason)
                .bind(&a.last_execution_error)
                .bind(a.version)
                .bind(a.created_at)
                .bind(a.updated_at)
                .execute(&mut **tx)
                .await?
            }
            EntityWrite::Contract(c) => {
                sqlx::query(
                    r#"
                    INSERT INTO contracts (
                        id, contract_type, motorcycle_id, party_id, amount, status,
                        approval_request_id, version, created_at, updated_at
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                    ON CONFLICT (id) DO UPDATE SET
                        amount = EXCLUDED.amount, status = EXCLUDED.status,
                        version = EXCLUDED.version, updated_at = EXCLUDED.updated_at
                    WHERE contracts.version = EXCLUDED.version - 1
                    "#,
                )
                .bind(c.id)
                .bind(c.contract_type)
                .bind(c.motorcycle_id)
                .bind(c.party_id)
                .bind(c.amount)
                .bind(c.status)
                .bind(c.approval_request_id)
                .bind(c.version)
                .bind(c.created_at)
                .bind(c.updated_at)
                .execute(&mut **tx)
                .await?
            }
        };

        Ok(result.rows_affected())
    }

    async fn append_history(
        tx: &mut Transaction<'_, Postgres>,
        entry: &StatusHistoryEntry,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO status_history (
                id, entity_kind, entity_id, from_status, to_status, actor_id, actor_role, note, recorded_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(entry.id)
        .bind(entry.entity_kind)
        .bind(entry.entity_id)
        .bind(&entry.from_status)
        .bind(&entry.to_status)
        .bind(entry.actor_id)
        .bind(entry.actor_role)
        .bind(&entry.note)
        .bind(entry.recorded_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl WorkflowStore for PgStore {
    async fn motorcycle(&self, id: Uuid) -> AppResult<Option<Motorcycle>> {
        let row = sqlx::query_as::<_, MotorcycleRow>("SELECT * FROM motorcycles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Motorcycle::from))
    }

    async fn list_motorcycles(&self) -> AppResult<Vec<Motorcycle>> {
        let rows = sqlx::query_as::<_, MotorcycleRow>(
            "SELECT * FROM motorcycles ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn inspection(&self, id: Uuid) -> AppResult<Option<Inspection>> {
        let row = sqlx::query_as::<_, InspectionRow>("SELECT * FROM inspections WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Inspection::from))
    }

    async fn inspections_for_motorcycle(&self, motorcycle_id: Uuid) -> AppResult<Vec<Inspection>> {
        let rows = sqlx::query_as::<_, InspectionRow>(
            "SELECT * FROM inspections WHERE motorcycle_id = $1 ORDER BY created_at",
        )
        .bind(motorcycle_id)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn repair(&self, id: Uuid) -> AppResult<Option<Repair>> {
        let row = sqlx::query_as::<_, RepairRow>("SELECT * FROM repairs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Repair::from))
    }

    async fn repairs_for_motorcycle(&self, motorcycle_id: Uuid) -> AppResult<Vec<Repair>> {
        let rows = sqlx::query_as::<_, RepairRow>(
            "SELECT * FROM repairs WHERE motorcycle_id = $1 ORDER BY created_at",
        )
        .bind(motorcycle_id)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn bill(&self, id: Uuid) -> AppResult<Option<RepairBill>> {
        let row = sqlx::query_as::<_, BillRow>("SELECT * FROM repair_bills WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(RepairBill::from))
    }

    async fn bills_for_repair(&self, repair_id: Uuid) -> AppResult<Vec<RepairBill>> {
        let rows = sqlx::query_as::<_, BillRow>(
            "SELECT * FROM repair_bills WHERE repair_id = $1 ORDER BY created_at",
        )
        .bind(repair_id)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn approval(&self, id: Uuid) -> AppResult<Option<ApprovalRequest>> {
        let row = sqlx::query_as::<_, ApprovalRow>("SELECT * FROM approval_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(ApprovalRequest::from))
    }

    async fn list_approvals(&self, status: Option<ApprovalStatus>) -> AppResult<Vec<ApprovalRequest>> {
        let rows = sqlx::query_as::<_, ApprovalRow>(
            r#"
            SELECT * FROM approval_requests
            WHERE ($1::approval_status IS NULL OR status = $1)
            ORDER BY created_at
            "#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn contract(&self, id: Uuid) -> AppResult<Option<Contract>> {
        let row = sqlx::query_as::<_, ContractRow>("SELECT * FROM contracts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Contract::from))
    }

    async fn history(&self, entity_id: Uuid) -> AppResult<Vec<StatusHistoryEntry>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            "SELECT * FROM status_history WHERE entity_id = $1 ORDER BY recorded_at",
        )
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn commit(&self, changes: &Changeset) -> AppResult<()> {
        if let Some((kind, id)) = changes.duplicate_write() {
            return Err(AppError::Internal(format!(
                "{} '{}' written twice in one changeset",
                kind, id
            )));
        }

        let mut tx = self.pool.begin().await?;

        for write in changes.writes() {
            let affected = Self::write(&mut tx, write).await?;
            if affected == 0 {
                warn!(
                    "⚔️ CAS perdido para {} '{}' (versión {})",
                    write.kind(),
                    write.id(),
                    write.version()
                );
                tx.rollback().await?;
                return Err(version_conflict(write.kind().as_str(), &write.id()));
            }
        }

        for entry in changes.history() {
            Self::append_history(&mut tx, entry).await?;
        }

        tx.commit().await?;
        debug!(
            "💾 Changeset confirmado en PostgreSQL: {} escrituras",
            changes.writes().len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::TypeInfo;

    const MIGRATION: &str = include_str!("../../migrations/20241017000000_workflow.sql");

    fn pg_type_name<T: sqlx::Type<Postgres>>() -> String {
        T::type_info().name().to_string()
    }

    #[test]
    fn test_every_enum_has_a_migrated_type() {
        let names = [
            pg_type_name::<MotorcycleStatus>(),
            pg_type_name::<PricingStatus>(),
            pg_type_name::<HoldKind>(),
            pg_type_name::<InspectionStatus>(),
            pg_type_name::<RepairStatus>(),
            pg_type_name::<BillStatus>(),
            pg_type_name::<ApprovalKind>(),
            pg_type_name::<ApprovalStatus>(),
            pg_type_name::<ApprovalPriority>(),
            pg_type_name::<ContractType>(),
            pg_type_name::<ContractStatus>(),
            pg_type_name::<EntityKind>(),
            pg_type_name::<Role>(),
        ];

        for name in names {
            let declaration = format!("CREATE TYPE {} AS ENUM", name);
            assert!(MIGRATION.contains(&declaration), "missing {}", declaration);
        }
    }

    #[test]
    fn test_enum_labels_match_domain_names() {
        let repair_labels = [
            RepairStatus::Pending,
            RepairStatus::InProgress,
            RepairStatus::AwaitingDetailsApproval,
            RepairStatus::DetailsApproved,
            RepairStatus::Completed,
            RepairStatus::Cancelled,
        ];
        for status in repair_labels {
            assert!(MIGRATION.contains(&format!("'{}'", status.as_str())));
        }
        assert!(MIGRATION.contains("'sent_to_cashier'"));
        assert!(MIGRATION.contains("'awaiting_details_approval'"));
    }
}
