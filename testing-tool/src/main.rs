use std::io::{self, Write};

use anyhow::{anyhow, Result};
use colored::*;
use reqwest::{Client, Method};
use serde_json::{json, Value};
use uuid::Uuid;

/// Usuario simulado; el servidor solo lee sus cabeceras
struct Persona {
    id: Uuid,
    role: &'static str,
}

impl Persona {
    fn new(role: &'static str) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
        }
    }
}

struct Api {
    client: Client,
    base_url: String,
}

impl Api {
    async fn call(&self, persona: &Persona, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .client
            .request(method.clone(), &url)
            .header("x-actor-id", persona.id.to_string())
            .header("x-actor-role", persona.role);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        if status.is_success() {
            println!("  {} {} {} ({})", "✅".green(), method, path, persona.role);
            Ok(body["data"].clone())
        } else {
            println!("  {} {} {} → {}", "❌".red(), method, path, status);
            println!("{}", serde_json::to_string_pretty(&body)?);
            Err(anyhow!("{} {} failed with {}", method, path, status))
        }
    }
}

fn id_of(value: &Value) -> Result<String> {
    value["id"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("response without id: {}", value))
}

#[tokio::main]
async fn main() -> Result<()> {
    println!("{}", "🏍️ Moto Workflow Testing Tool".bright_blue().bold());
    println!("{}", "=====================================".bright_blue());
    println!();

    print!("{}", "URL del servidor [http://localhost:3000]: ".bright_yellow());
    io::stdout().flush()?;
    let mut base_url = String::new();
    io::stdin().read_line(&mut base_url)?;
    let base_url = match base_url.trim() {
        "" => "http://localhost:3000".to_string(),
        url => url.trim_end_matches('/').to_string(),
    };

    let api = Api {
        client: Client::new(),
        base_url,
    };

    loop {
        println!();
        println!("{}", "📋 MENÚ PRINCIPAL".bright_green().bold());
        println!("{}", "==================".bright_green());
        println!("1. 🔧 Ciclo completo de reparación (detalles → aprobación → caja → precio)");
        println!("2. 🔍 Inspección RAMA / GIDIONI con fallas");
        println!("3. 🚪 Salir");
        print!("{}", "Selecciona una opción (1-3): ".bright_yellow());
        io::stdout().flush()?;

        let mut choice = String::new();
        io::stdin().read_line(&mut choice)?;

        let outcome = match choice.trim() {
            "1" => repair_cycle(&api).await,
            "2" => inspection_cycle(&api).await,
            "3" => {
                println!("{}", "👋 ¡Hasta luego!".bright_green());
                break;
            }
            _ => {
                println!("{}", "❌ Opción inválida. Intenta de nuevo.".bright_red());
                continue;
            }
        };

        if let Err(e) = outcome {
            println!("{} {}", "💥 Escenario interrumpido:".bright_red().bold(), e);
        }
    }

    Ok(())
}

async fn register_moto(api: &Api, admin: &Persona) -> Result<String> {
    let moto = api
        .call(
            admin,
            Method::POST,
            "/api/motorcycles",
            Some(json!({
                "brand": "Bajaj",
                "model": "Boxer 150",
                "year": 2022,
                "acquisition_cost": "850000"
            })),
        )
        .await?;
    id_of(&moto)
}

async fn repair_cycle(api: &Api) -> Result<()> {
    println!();
    println!("{}", "🔧 CICLO DE REPARACIÓN".bright_cyan().bold());

    let admin = Persona::new("admin");
    let sales = Persona::new("sales");
    let mechanic = Persona::new("mechanic");
    let cashier = Persona::new("cashier");

    let moto_id = register_moto(api, &admin).await?;
    let repair = api
        .call(
            &admin,
            Method::POST,
            "/api/repairs",
            Some(json!({
                "motorcycle_id": moto_id,
                "mechanic_id": mechanic.id,
                "description": "Cambio de kit de arrastre"
            })),
        )
        .await?;
    let repair_id = id_of(&repair)?;

    api.call(&mechanic, Method::POST, &format!("/api/repairs/{}/start", repair_id), None)
        .await?;
    let details = api
        .call(
            &mechanic,
            Method::POST,
            &format!("/api/repairs/{}/details", repair_id),
            Some(json!({
                "work_items": [{
                    "description": "Kit de arrastre",
                    "labor_cost": "50000",
                    "spare_parts": [{ "name": "Cadena y piñones", "quantity": 1, "cost": "100000" }]
                }],
                "expected_status": "in_progress"
            })),
        )
        .await?;
    let request_id = id_of(&details["approval_request"])?;

    api.call(&sales, Method::POST, &format!("/api/approvals/{}/sales-approve", request_id), None)
        .await?;
    api.call(&admin, Method::POST, &format!("/api/approvals/{}/admin-approve", request_id), None)
        .await?;

    let bill = api
        .call(&mechanic, Method::POST, "/api/bills", Some(json!({ "repair_id": repair_id })))
        .await?;
    let bill_id = id_of(&bill)?;
    api.call(&mechanic, Method::POST, &format!("/api/bills/{}/send", bill_id), None)
        .await?;
    api.call(&cashier, Method::POST, &format!("/api/bills/{}/approve-payment", bill_id), None)
        .await?;
    api.call(&cashier, Method::POST, &format!("/api/bills/{}/mark-paid", bill_id), None)
        .await?;
    api.call(&mechanic, Method::POST, &format!("/api/repairs/{}/complete", repair_id), None)
        .await?;

    let moto = api
        .call(
            &admin,
            Method::POST,
            &format!("/api/motorcycles/{}/price", moto_id),
            Some(json!({ "profit_margin": "20", "expected_status": "pending_pricing" })),
        )
        .await?;

    println!();
    println!("{}", "💰 Resultado:".bright_blue());
    println!("   Costo total: {}", moto["total_cost"]);
    println!("   Precio de venta: {}", moto["sale_price"]);
    println!("   Estado: {}", moto["status"]);

    let report = api
        .call(&admin, Method::GET, &format!("/api/motorcycles/{}/invariants", moto_id), None)
        .await?;
    println!("   Incoherencias: {}", report["violations"]);
    Ok(())
}

async fn inspection_cycle(api: &Api) -> Result<()> {
    println!();
    println!("{}", "🔍 INSPECCIÓN RAMA / GIDIONI".bright_cyan().bold());

    let admin = Persona::new("admin");
    let registration = Persona::new("registration");
    let transport = Persona::new("transport");

    let moto_id = register_moto(api, &admin).await?;
    let inspection = api
        .call(
            &registration,
            Method::POST,
            "/api/inspections",
            Some(json!({ "motorcycle_id": moto_id })),
        )
        .await?;
    let inspection_id = id_of(&inspection)?;

    api.call(
        &registration,
        Method::POST,
        &format!("/api/inspections/{}/verify-rama", inspection_id),
        Some(json!({ "seller_information": { "full_name": "Juma Hassan", "phone": "+255700000000" } })),
    )
    .await?;

    let outcome = api
        .call(
            &transport,
            Method::POST,
            &format!("/api/inspections/{}/verify-gidioni", inspection_id),
            Some(json!({
                "checklists": {
                    "external_appearance": { "paint": false, "mirrors": true },
                    "electrical_system": { "headlight": false },
                    "engine_system": { "oil_leak": false }
                },
                "expected_status": "gidioni_pending"
            })),
        )
        .await?;

    println!();
    println!("{}", "🔧 Reparación generada:".bright_blue());
    println!("{}", serde_json::to_string_pretty(&outcome["spawned_repair"])?);
    Ok(())
}
