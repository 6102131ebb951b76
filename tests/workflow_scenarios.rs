use std::sync::Arc;

use futures::future::join_all;
use rust_decimal::Decimal;
use serde_json::json;
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

use moto_workflow::config::EnvironmentConfig;
use moto_workflow::models::{
    Actor, ApprovalKind, ApprovalPriority, ApprovalRequest, ApprovalStatus, BillStatus,
    EntityKind, Holder, InspectionChecklists, InspectionStatus, Motorcycle, MotorcycleDetails,
    MotorcycleStatus, PricingStatus, Repair, RepairStatus, Role, SellerInformation, SparePart,
    WorkItem, WorkflowEvent,
};
use moto_workflow::repositories::{MemoryStore, WorkflowStore};
use moto_workflow::services::{ChannelNotifier, PriceInput};
use moto_workflow::state::AppState;
use moto_workflow::utils::errors::AppError;

struct Harness {
    state: AppState,
    events: UnboundedReceiver<WorkflowEvent>,
    admin: Actor,
    sales: Actor,
    mechanic: Actor,
    cashier: Actor,
    registration: Actor,
    transport: Actor,
}

fn actor(role: Role) -> Actor {
    Actor::new(Uuid::new_v4(), role)
}

fn dec(value: i64) -> Decimal {
    Decimal::from(value)
}

fn harness() -> Harness {
    let store: Arc<dyn WorkflowStore> = Arc::new(MemoryStore::new());
    let (notifier, events) = ChannelNotifier::new();
    let state = AppState::new(EnvironmentConfig::default(), store, Arc::new(notifier));

    Harness {
        state,
        events,
        admin: actor(Role::Admin),
        sales: actor(Role::Sales),
        mechanic: actor(Role::Mechanic),
        cashier: actor(Role::Cashier),
        registration: actor(Role::Registration),
        transport: actor(Role::Transport),
    }
}

impl Harness {
    async fn register_moto(&self, acquisition_cost: i64) -> Motorcycle {
        let details = MotorcycleDetails {
            brand: "Bajaj".into(),
            model: "Boxer 150".into(),
            year: Some(2021),
            ..Default::default()
        };
        self.state
            .motorcycles
            .register(&self.admin, details, dec(acquisition_cost))
            .await
            .unwrap()
    }

    async fn moto(&self, id: Uuid) -> Motorcycle {
        self.state.motorcycles.get(id).await.unwrap()
    }

    async fn assign_repair(&self, motorcycle_id: Uuid) -> Repair {
        self.state
            .repairs
            .assign(&self.admin, motorcycle_id, Some(self.mechanic.id), "Cambio de cadena".into())
            .await
            .unwrap()
    }

    /// Reparación en awaiting_details_approval con su solicitud repair_edit
    async fn repair_with_details(&self, motorcycle_id: Uuid) -> (Repair, ApprovalRequest) {
        let repair = self.assign_repair(motorcycle_id).await;
        self.state
            .repairs
            .start_work(&self.mechanic, repair.id, Some(RepairStatus::Pending))
            .await
            .unwrap();
        self.state
            .repairs
            .register_details(
                &self.mechanic,
                repair.id,
                vec![work_item(50_000, 100_000)],
                vec!["cadena gastada".into()],
                vec!["foto-cadena.jpg".into()],
                Some(RepairStatus::InProgress),
            )
            .await
            .unwrap()
    }

    async fn approve(&self, request_id: Uuid) -> Result<ApprovalRequest, AppError> {
        self.state
            .approvals
            .sales_approve(&self.sales, request_id, None, Some(ApprovalStatus::PendingSales))
            .await?;
        self.state
            .approvals
            .admin_approve(&self.admin, request_id, None, Some(ApprovalStatus::PendingAdmin))
            .await
    }

    /// Reparación con detalles ya aprobados (total 150000)
    async fn approved_repair(&self, motorcycle_id: Uuid) -> Repair {
        let (repair, request) = self.repair_with_details(motorcycle_id).await;
        self.approve(request.id).await.unwrap();
        self.state.repairs.get(repair.id).await.unwrap()
    }

    fn drain_events(&mut self) -> Vec<WorkflowEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

fn work_item(labor: i64, part: i64) -> WorkItem {
    WorkItem {
        description: "Cambio de kit de arrastre".into(),
        labor_cost: dec(labor),
        spare_parts: vec![SparePart {
            name: "Kit de arrastre".into(),
            quantity: 1,
            cost: dec(part),
        }],
    }
}

fn failing_checklists() -> InspectionChecklists {
    let mut checklists = InspectionChecklists::default();
    checklists.external_appearance.insert("paint".into(), Some(false));
    checklists.external_appearance.insert("mirrors".into(), Some(true));
    checklists.electrical_system.insert("headlight".into(), Some(false));
    checklists.engine_system.insert("oil_leak".into(), Some(false));
    checklists.engine_system.insert("starts".into(), None);
    checklists
}

#[tokio::test]
async fn test_registering_details_opens_repair_edit_request() {
    let h = harness();
    let moto = h.register_moto(850_000).await;
    let (repair, request) = h.repair_with_details(moto.id).await;

    assert_eq!(repair.status, RepairStatus::AwaitingDetailsApproval);
    assert_eq!(repair.total_cost, dec(150_000));
    assert_eq!(repair.labor_cost, dec(50_000));
    assert_eq!(repair.details_request_id, Some(request.id));

    assert_eq!(request.approval_type, ApprovalKind::RepairEdit);
    assert_eq!(request.status, ApprovalStatus::PendingSales);
    assert_eq!(request.subject_id, Some(repair.id));

    let moto = h.moto(moto.id).await;
    assert_eq!(moto.status, MotorcycleStatus::InRepair);
    assert_eq!(moto.hold, Some(Holder::repair(repair.id)));
}

#[tokio::test]
async fn test_approval_chain_applies_details_once() {
    let h = harness();
    let moto = h.register_moto(850_000).await;
    let (repair, request) = h.repair_with_details(moto.id).await;

    let approved = h.approve(request.id).await.unwrap();
    assert_eq!(approved.status, ApprovalStatus::Approved);
    assert!(approved.sales_approved_by.is_some());
    assert_eq!(approved.admin_approved_by, Some(h.admin.id));

    let repair = h.state.repairs.get(repair.id).await.unwrap();
    assert_eq!(repair.status, RepairStatus::DetailsApproved);

    let again = h
        .state
        .approvals
        .admin_approve(&h.admin, request.id, None, None)
        .await;
    assert!(matches!(again, Err(AppError::InvalidTransition(_))));
}

#[tokio::test]
async fn test_second_bill_conflicts_while_first_is_with_cashier() {
    let h = harness();
    let moto = h.register_moto(850_000).await;
    let repair = h.approved_repair(moto.id).await;

    let bill = h.state.billing.create_bill(&h.mechanic, repair.id).await.unwrap();
    assert_eq!(bill.total_amount, dec(150_000));
    h.state
        .billing
        .send(&h.mechanic, bill.id, Some(BillStatus::Draft))
        .await
        .unwrap();

    let second = h.state.billing.create_bill(&h.mechanic, repair.id).await;
    assert!(matches!(second, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn test_full_cycle_ends_with_priced_motorcycle_in_stock() {
    let mut h = harness();
    let moto = h.register_moto(850_000).await;
    let repair = h.approved_repair(moto.id).await;

    let bill = h.state.billing.create_bill(&h.mechanic, repair.id).await.unwrap();
    h.state.billing.send(&h.mechanic, bill.id, None).await.unwrap();
    h.state
        .billing
        .approve_payment(&h.cashier, bill.id, Some(BillStatus::SentToCashier))
        .await
        .unwrap();

    let priced_later = h.moto(moto.id).await;
    assert_eq!(priced_later.total_cost, dec(1_000_000));
    assert_eq!(priced_later.pricing_status, Some(PricingStatus::PendingPricing));

    h.state.billing.mark_paid(&h.cashier, bill.id, None).await.unwrap();
    let repair = h
        .state
        .repairs
        .complete(&h.mechanic, repair.id, Some(RepairStatus::DetailsApproved))
        .await
        .unwrap();
    assert_eq!(repair.status, RepairStatus::Completed);

    let moto = h
        .state
        .pricing
        .set_sale_price(
            &h.admin,
            moto.id,
            PriceInput::Margin(dec(20)),
            Some(PricingStatus::PendingPricing),
        )
        .await
        .unwrap();
    assert_eq!(moto.sale_price, Some(dec(1_200_000)));
    assert_eq!(moto.profit, Some(dec(200_000)));
    assert_eq!(moto.pricing_status, Some(PricingStatus::Approved));
    assert_eq!(moto.status, MotorcycleStatus::InStock);
    assert!(moto.hold.is_none());

    let report = h.state.motorcycles.invariants(moto.id).await.unwrap();
    assert!(report.violations.is_empty());

    let kinds: Vec<EntityKind> = h.drain_events().iter().map(|e| e.entity_kind).collect();
    assert!(kinds.contains(&EntityKind::ApprovalRequest));
    assert!(kinds.contains(&EntityKind::RepairBill));
    assert!(kinds.contains(&EntityKind::Repair));
}

#[tokio::test]
async fn test_gidioni_failures_spawn_repair() {
    let h = harness();
    let moto = h.register_moto(600_000).await;

    let inspection = h
        .state
        .inspections
        .create(&h.registration, moto.id, None, None)
        .await
        .unwrap();
    assert_eq!(h.moto(moto.id).await.status, MotorcycleStatus::InTransit);

    let seller = SellerInformation {
        full_name: "Juma Hassan".into(),
        phone: Some("+255700000000".into()),
        ..Default::default()
    };
    h.state
        .inspections
        .verify_rama(&h.registration, inspection.id, Some(seller), Some(InspectionStatus::RamaPending))
        .await
        .unwrap();

    // transporte ve la fase RAMA cerrada como gidioni_pending
    let outcome = h
        .state
        .inspections
        .verify_gidioni(
            &h.transport,
            inspection.id,
            Some(failing_checklists()),
            true,
            None,
            Some(InspectionStatus::GidioniPending),
        )
        .await
        .unwrap();

    assert_eq!(outcome.inspection.workflow_status, InspectionStatus::GidioniCompleted);
    let repair = outcome.spawned_repair.expect("repair for failed items");
    assert_eq!(repair.issues_found.len(), 3);
    assert!(repair.issues_found.contains(&"engine_system.oil_leak".to_string()));
    assert_eq!(repair.inspection_id, Some(inspection.id));
    assert_eq!(outcome.inspection.spawned_repair_id, Some(repair.id));

    let moto = h.moto(moto.id).await;
    assert_eq!(moto.status, MotorcycleStatus::InRepair);
    assert_eq!(moto.hold, Some(Holder::repair(repair.id)));

    let report = h.state.motorcycles.invariants(moto.id).await.unwrap();
    assert!(report.violations.is_empty(), "{:?}", report.violations);
}

#[tokio::test]
async fn test_clean_gidioni_returns_motorcycle_to_stock() {
    let h = harness();
    let moto = h.register_moto(600_000).await;
    let inspection = h
        .state
        .inspections
        .create(&h.registration, moto.id, None, None)
        .await
        .unwrap();

    let early = h
        .state
        .inspections
        .verify_gidioni(&h.transport, inspection.id, None, true, None, None)
        .await;
    assert!(matches!(early, Err(AppError::InvalidTransition(_))));

    h.state
        .inspections
        .save_seller_info(
            &h.registration,
            inspection.id,
            SellerInformation {
                full_name: "Asha Mwinyi".into(),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();
    h.state
        .inspections
        .verify_rama(&h.registration, inspection.id, None, None)
        .await
        .unwrap();

    let outcome = h
        .state
        .inspections
        .verify_gidioni(&h.transport, inspection.id, None, true, None, None)
        .await
        .unwrap();
    assert!(outcome.spawned_repair.is_none());

    let moto = h.moto(moto.id).await;
    assert_eq!(moto.status, MotorcycleStatus::InStock);
    assert!(moto.hold.is_none());
}

#[tokio::test]
async fn test_saved_checklists_feed_spawned_repair_awaiting_mechanic() {
    let h = harness();
    let moto = h.register_moto(600_000).await;
    let inspection = h
        .state
        .inspections
        .create(&h.registration, moto.id, None, None)
        .await
        .unwrap();
    h.state
        .inspections
        .verify_rama(
            &h.registration,
            inspection.id,
            Some(SellerInformation {
                full_name: "Rehema Ally".into(),
                ..Default::default()
            }),
            None,
        )
        .await
        .unwrap();

    let draft = h
        .state
        .inspections
        .save_checklists(
            &h.transport,
            inspection.id,
            failing_checklists(),
            Some(InspectionStatus::GidioniPending),
        )
        .await
        .unwrap();
    assert_eq!(draft.workflow_status, InspectionStatus::GidioniPending);

    let outcome = h
        .state
        .inspections
        .verify_gidioni(&h.transport, inspection.id, None, true, None, None)
        .await
        .unwrap();
    let repair = outcome.spawned_repair.expect("repair for saved failures");
    assert_eq!(repair.issues_found.len(), 3);
    assert_eq!(repair.mechanic_id, None);

    let unassigned = h
        .state
        .repairs
        .start_work(&h.mechanic, repair.id, Some(RepairStatus::Pending))
        .await;
    assert!(matches!(unassigned, Err(AppError::Unauthorized(_))));

    let by_mechanic = h
        .state
        .repairs
        .assign_mechanic(&h.mechanic, repair.id, h.mechanic.id, None)
        .await;
    assert!(matches!(by_mechanic, Err(AppError::Unauthorized(_))));

    let assigned = h
        .state
        .repairs
        .assign_mechanic(&h.admin, repair.id, h.mechanic.id, Some(RepairStatus::Pending))
        .await
        .unwrap();
    assert_eq!(assigned.mechanic_id, Some(h.mechanic.id));

    h.state
        .repairs
        .start_work(&h.mechanic, repair.id, Some(RepairStatus::Pending))
        .await
        .unwrap();
    let late = h
        .state
        .repairs
        .assign_mechanic(&h.admin, repair.id, Uuid::new_v4(), None)
        .await;
    assert!(matches!(late, Err(AppError::InvalidTransition(_))));

    let frozen = h
        .state
        .inspections
        .save_checklists(&h.transport, inspection.id, InspectionChecklists::default(), None)
        .await;
    assert!(matches!(frozen, Err(AppError::InvalidTransition(_))));
}

#[tokio::test]
async fn test_terminal_repair_accepts_no_transition() {
    let h = harness();
    let moto = h.register_moto(500_000).await;
    let repair = h.approved_repair(moto.id).await;
    h.state.repairs.complete(&h.admin, repair.id, None).await.unwrap();

    let start = h.state.repairs.start_work(&h.admin, repair.id, None).await;
    let cancel = h.state.repairs.cancel(&h.admin, repair.id, None).await;
    let complete = h.state.repairs.complete(&h.admin, repair.id, None).await;
    assert!(matches!(start, Err(AppError::InvalidTransition(_))));
    assert!(matches!(cancel, Err(AppError::InvalidTransition(_))));
    assert!(matches!(complete, Err(AppError::InvalidTransition(_))));

    let history = h.state.store.history(repair.id).await.unwrap();
    assert!(history
        .iter()
        .all(|entry| entry.from_status.as_deref() != Some("completed")));
}

#[tokio::test]
async fn test_cancelling_twice_leaves_motorcycle_untouched() {
    let h = harness();
    let moto = h.register_moto(500_000).await;
    let repair = h.assign_repair(moto.id).await;
    assert_eq!(h.moto(moto.id).await.status, MotorcycleStatus::InRepair);

    let cancelled = h
        .state
        .repairs
        .cancel(&h.admin, repair.id, Some(RepairStatus::Pending))
        .await
        .unwrap();
    assert_eq!(cancelled.status, RepairStatus::Cancelled);

    let after_first = h.moto(moto.id).await;
    assert_eq!(after_first.status, MotorcycleStatus::InStock);
    assert!(after_first.hold.is_none());

    let again = h.state.repairs.cancel(&h.admin, repair.id, None).await;
    assert!(matches!(again, Err(AppError::InvalidTransition(_))));

    let after_second = h.moto(moto.id).await;
    assert_eq!(after_second.status, after_first.status);
    assert_eq!(after_second.hold, after_first.hold);
    assert_eq!(after_second.version, after_first.version);
    assert_eq!(after_second, after_first);
}

#[tokio::test]
async fn test_cancel_rejects_pending_details_request() {
    let h = harness();
    let moto = h.register_moto(500_000).await;
    let (repair, request) = h.repair_with_details(moto.id).await;

    h.state
        .repairs
        .cancel(&h.admin, repair.id, Some(RepairStatus::AwaitingDetailsApproval))
        .await
        .unwrap();

    let request = h.state.approvals.get(request.id).await.unwrap();
    assert_eq!(request.status, ApprovalStatus::Rejected);
    assert_eq!(request.rejected_by, Some(h.admin.id));

    let late = h
        .state
        .approvals
        .sales_approve(&h.sales, request.id, None, None)
        .await;
    assert!(matches!(late, Err(AppError::InvalidTransition(_))));

    let history = h.state.store.history(request.id).await.unwrap();
    assert_eq!(history.last().map(|e| e.to_status.as_str()), Some("rejected"));
    assert_eq!(h.state.repairs.get(repair.id).await.unwrap().status, RepairStatus::Cancelled);
}

#[tokio::test]
async fn test_pricing_waits_for_payment_approval() {
    let h = harness();
    let moto = h.register_moto(850_000).await;
    let repair = h.approved_repair(moto.id).await;
    let bill = h.state.billing.create_bill(&h.mechanic, repair.id).await.unwrap();

    h.state.repairs.complete(&h.mechanic, repair.id, None).await.unwrap();
    let completed = h.moto(moto.id).await;
    assert_eq!(completed.status, MotorcycleStatus::InStock);
    assert_eq!(completed.pricing_status, None);
    assert_eq!(completed.total_cost, dec(850_000));

    let early = h
        .state
        .pricing
        .set_sale_price(&h.admin, moto.id, PriceInput::Margin(dec(20)), None)
        .await;
    assert!(matches!(early, Err(AppError::InvalidTransition(_))));
    assert_eq!(h.moto(moto.id).await.sale_price, None);

    h.state.billing.send(&h.mechanic, bill.id, None).await.unwrap();
    h.state.billing.approve_payment(&h.cashier, bill.id, None).await.unwrap();
    let costed = h.moto(moto.id).await;
    assert_eq!(costed.pricing_status, Some(PricingStatus::PendingPricing));
    assert_eq!(costed.total_cost, dec(1_000_000));

    let priced = h
        .state
        .pricing
        .set_sale_price(&h.admin, moto.id, PriceInput::Margin(dec(20)), None)
        .await
        .unwrap();
    assert_eq!(priced.sale_price, Some(dec(1_200_000)));
}

#[tokio::test]
async fn test_stale_expected_status_is_a_conflict() {
    let h = harness();
    let moto = h.register_moto(500_000).await;
    let repair = h.assign_repair(moto.id).await;
    h.state.repairs.start_work(&h.mechanic, repair.id, None).await.unwrap();

    let stale = h
        .state
        .repairs
        .start_work(&h.mechanic, repair.id, Some(RepairStatus::Pending))
        .await;
    assert!(matches!(stale, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn test_guards_check_status_before_role() {
    let h = harness();
    let moto = h.register_moto(500_000).await;
    let repair = h.assign_repair(moto.id).await;
    let stranger = actor(Role::Mechanic);

    let not_yet = h.state.repairs.complete(&stranger, repair.id, None).await;
    assert!(matches!(not_yet, Err(AppError::InvalidTransition(_))));

    let wrong_mechanic = h.state.repairs.start_work(&stranger, repair.id, None).await;
    assert!(matches!(wrong_mechanic, Err(AppError::Unauthorized(_))));
}

#[tokio::test]
async fn test_rejected_details_send_repair_back_to_work() {
    let mut h = harness();
    let moto = h.register_moto(500_000).await;
    let (repair, request) = h.repair_with_details(moto.id).await;

    let rejected = h
        .state
        .approvals
        .reject(&h.sales, request.id, "faltan fotos", Some(ApprovalStatus::PendingSales))
        .await
        .unwrap();
    assert_eq!(rejected.status, ApprovalStatus::Rejected);
    assert_eq!(rejected.rejection_reason.as_deref(), Some("faltan fotos"));

    let repair = h.state.repairs.get(repair.id).await.unwrap();
    assert_eq!(repair.status, RepairStatus::InProgress);
    assert!(repair.details_request_id.is_none());

    let after_reject = h.state.approvals.admin_approve(&h.admin, request.id, None, None).await;
    assert!(matches!(after_reject, Err(AppError::InvalidTransition(_))));

    let events = h.drain_events();
    assert!(events
        .iter()
        .any(|e| e.entity_id == request.id && e.status == "rejected"));
}

#[tokio::test]
async fn test_executor_failure_keeps_request_pending_admin() {
    let h = harness();
    let moto = h.register_moto(500_000).await;
    let (repair, details) = h.repair_with_details(moto.id).await;

    let completion = h
        .state
        .approvals
        .submit(
            &h.mechanic,
            ApprovalKind::RepairCompletion,
            json!({ "repair_id": repair.id }),
            ApprovalPriority::High,
        )
        .await
        .unwrap();

    // la reparación todavía espera la aprobación de sus detalles
    let failed = h.approve(completion.id).await;
    assert!(matches!(failed, Err(AppError::ExecutorFailure { .. })));

    let pending = h.state.approvals.get(completion.id).await.unwrap();
    assert_eq!(pending.status, ApprovalStatus::PendingAdmin);
    assert!(pending.last_execution_error.is_some());
    assert_eq!(h.moto(moto.id).await.status, MotorcycleStatus::InRepair);

    h.approve(details.id).await.unwrap();
    let retried = h
        .state
        .approvals
        .admin_approve(&h.admin, completion.id, None, Some(ApprovalStatus::PendingAdmin))
        .await
        .unwrap();
    assert_eq!(retried.status, ApprovalStatus::Approved);
    assert!(retried.last_execution_error.is_none());

    let repair = h.state.repairs.get(repair.id).await.unwrap();
    assert_eq!(repair.status, RepairStatus::Completed);
    let moto = h.moto(moto.id).await;
    assert_eq!(moto.status, MotorcycleStatus::InStock);
    assert!(moto.hold.is_none());
}

#[tokio::test]
async fn test_bill_amount_is_frozen_against_cost_edits() {
    let h = harness();
    let moto = h.register_moto(500_000).await;
    let repair = h.approved_repair(moto.id).await;
    let bill = h.state.billing.create_bill(&h.mechanic, repair.id).await.unwrap();

    let edit = h
        .state
        .repairs
        .request_cost_edit(&h.mechanic, repair.id, vec![work_item(70_000, 100_000)], ApprovalPriority::Normal)
        .await
        .unwrap();
    h.approve(edit.id).await.unwrap();

    let repair = h.state.repairs.get(repair.id).await.unwrap();
    assert_eq!(repair.status, RepairStatus::DetailsApproved);
    assert_eq!(repair.total_cost, dec(170_000));

    let bill = h.state.billing.get(bill.id).await.unwrap();
    assert_eq!(bill.total_amount, dec(150_000));
}

#[tokio::test]
async fn test_purchase_contract_registers_motorcycle() {
    let h = harness();
    let staff = actor(Role::Staff);
    let request = h
        .state
        .approvals
        .submit(
            &staff,
            ApprovalKind::ContractCreation,
            json!({
                "contract_type": "purchase",
                "party_id": Uuid::new_v4(),
                "amount": "900000",
                "motorcycle": { "brand": "TVS", "model": "HLX 125" }
            }),
            ApprovalPriority::Normal,
        )
        .await
        .unwrap();
    assert!(h.state.motorcycles.list().await.unwrap().is_empty());

    h.approve(request.id).await.unwrap();

    let motos = h.state.motorcycles.list().await.unwrap();
    assert_eq!(motos.len(), 1);
    assert_eq!(motos[0].acquisition_cost, dec(900_000));
    assert_eq!(motos[0].status, MotorcycleStatus::InStock);
}

#[tokio::test]
async fn test_sold_motorcycle_cannot_be_claimed() {
    let h = harness();
    let moto = h.register_moto(500_000).await;
    let request = h
        .state
        .approvals
        .submit(
            &h.sales,
            ApprovalKind::ContractCreation,
            json!({
                "contract_type": "sale",
                "party_id": Uuid::new_v4(),
                "amount": 750000,
                "motorcycle_id": moto.id
            }),
            ApprovalPriority::Normal,
        )
        .await
        .unwrap();
    h.approve(request.id).await.unwrap();
    assert_eq!(h.moto(moto.id).await.status, MotorcycleStatus::Sold);

    let claim = h
        .state
        .repairs
        .assign(&h.admin, moto.id, None, "Revisión post-venta".into())
        .await;
    assert!(matches!(claim, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn test_motorcycle_edit_cannot_touch_status() {
    let h = harness();
    let moto = h.register_moto(500_000).await;
    let submitted = h
        .state
        .approvals
        .submit(
            &h.admin,
            ApprovalKind::MotorcycleEdit,
            json!({ "motorcycle_id": moto.id, "status": "sold" }),
            ApprovalPriority::Normal,
        )
        .await;
    assert!(matches!(submitted, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_concurrent_sales_approvals_have_one_winner() {
    let h = harness();
    let moto = h.register_moto(500_000).await;
    let (_, request) = h.repair_with_details(moto.id).await;
    let second_sales = actor(Role::Sales);

    let results = join_all([
        h.state
            .approvals
            .sales_approve(&h.sales, request.id, None, Some(ApprovalStatus::PendingSales)),
        h.state
            .approvals
            .sales_approve(&second_sales, request.id, None, Some(ApprovalStatus::PendingSales)),
    ])
    .await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(AppError::Conflict(_)))));

    let history = h.state.store.history(request.id).await.unwrap();
    assert_eq!(
        history.iter().filter(|e| e.to_status == "pending_admin").count(),
        1
    );
}

#[tokio::test]
async fn test_concurrent_claims_leave_one_holder() {
    let h = harness();
    let moto = h.register_moto(500_000).await;

    let results = join_all([
        h.state.repairs.assign(&h.admin, moto.id, None, "Frenos".into()),
        h.state.repairs.assign(&h.admin, moto.id, None, "Embrague".into()),
    ])
    .await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let winner = results.iter().find_map(|r| r.as_ref().ok()).unwrap();

    let moto = h.moto(moto.id).await;
    assert_eq!(moto.hold, Some(Holder::repair(winner.id)));
    assert_eq!(h.state.repairs.list_for_motorcycle(moto.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_concurrent_payment_approvals_freeze_cost_once() {
    let h = harness();
    let moto = h.register_moto(850_000).await;
    let repair = h.approved_repair(moto.id).await;
    let bill = h.state.billing.create_bill(&h.mechanic, repair.id).await.unwrap();
    h.state.billing.send(&h.mechanic, bill.id, None).await.unwrap();

    let other_cashier = actor(Role::Cashier);
    let results = join_all([
        h.state
            .billing
            .approve_payment(&h.cashier, bill.id, Some(BillStatus::SentToCashier)),
        h.state
            .billing
            .approve_payment(&other_cashier, bill.id, Some(BillStatus::SentToCashier)),
    ])
    .await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(h.moto(moto.id).await.total_cost, dec(1_000_000));
}

#[tokio::test]
async fn test_stale_requests_use_configured_threshold() {
    let h = harness();
    let moto = h.register_moto(500_000).await;
    h.repair_with_details(moto.id).await;

    let fresh = h.state.approvals.stale_requests(None).await.unwrap();
    assert!(fresh.is_empty());

    let all_pending = h
        .state
        .approvals
        .stale_requests(Some(chrono::Duration::zero()))
        .await
        .unwrap();
    assert_eq!(all_pending.len(), 1);
}
