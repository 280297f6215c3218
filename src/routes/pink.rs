//! Pink Mobile voice-assistant tools.
//!
//! Every handler answers with the tool-results envelope so the
//! assistant can speak the `message` field directly. Hard failures
//! still return the envelope, with a scripted apology and a 500.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{NaiveDate, Utc};
use rand::Rng;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::db;
use crate::error::AppError;
use crate::pink::{
    find_promo, lines_needed_for_free_ipad, normalize_phone, pins_match, select_roaming_pass,
    summarize_ticket, travel_days, LineType,
};
use crate::routes::AppState;
use crate::vapi::tools::{ToolInvocation, ToolResults, TransferDestination};

fn respond(
    invocation: &ToolInvocation,
    outcome: Result<ToolResults, AppError>,
    apology: &str,
) -> Response {
    match outcome {
        Ok(results) => Json(results).into_response(),
        Err(e) => {
            tracing::error!("Tool handler failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ToolResults::apology(&invocation.tool_call_id, apology)),
            )
                .into_response()
        }
    }
}

/// Best-effort audit write. Tool replies never fail on logging.
async fn log_action(state: &AppState, session_id: &str, action_type: &str, details: Value) {
    if let Err(e) = db::ai_log::log_action(&state.db, session_id, action_type, &details).await {
        tracing::warn!("Could not log {action_type} action: {e}");
    }
}

fn customer_id_arg(invocation: &ToolInvocation) -> Option<Uuid> {
    invocation
        .str_arg(&["customerId", "customer_id"])
        .and_then(|id| id.parse().ok())
}

pub async fn customer_lookup(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Response {
    let inv = ToolInvocation::from_body(body);
    let outcome = customer_lookup_inner(&state, &inv).await;
    respond(
        &inv,
        outcome,
        "I'm having trouble accessing customer information. Please try again.",
    )
}

async fn customer_lookup_inner(
    state: &AppState,
    inv: &ToolInvocation,
) -> Result<ToolResults, AppError> {
    let phone = inv
        .str_arg(&["phoneNumber", "phone"])
        .or_else(|| inv.platform_caller_number());

    let Some(phone) = phone else {
        return Ok(ToolResults::reply(
            &inv.tool_call_id,
            &json!({
                "success": false,
                "message": "Please provide a phone number to look up the account."
            }),
        ));
    };

    let normalized = normalize_phone(&phone);
    tracing::info!("Customer lookup for {normalized}");

    let Some(customer) = db::pink::get_customer_by_phone(&state.db, &normalized).await? else {
        return Ok(ToolResults::reply(
            &inv.tool_call_id,
            &json!({
                "success": false,
                "customerFound": false,
                "message": "I couldn't find an account with that phone number. Please verify the number."
            }),
        ));
    };

    let total_lines = db::pink::count_lines(&state.db, customer.id).await?;

    Ok(ToolResults::reply(
        &inv.tool_call_id,
        &json!({
            "success": true,
            "customerFound": true,
            "customer": {
                "id": customer.id,
                "name": customer.name,
                "phone": customer.phone,
                "totalLines": total_lines
            },
            "message": format!(
                "Found customer {}. Please ask for their 4-digit security PIN to verify identity.",
                customer.name
            )
        }),
    ))
}

pub async fn verify_pin(State(state): State<Arc<AppState>>, Json(body): Json<Value>) -> Response {
    let inv = ToolInvocation::from_body(body);
    let outcome = verify_pin_inner(&state, &inv).await;
    respond(
        &inv,
        outcome,
        "I'm having trouble verifying the PIN. Please try again.",
    )
}

async fn verify_pin_inner(state: &AppState, inv: &ToolInvocation) -> Result<ToolResults, AppError> {
    let Some(pin) = inv.str_arg(&["pin"]) else {
        return Ok(ToolResults::reply(
            &inv.tool_call_id,
            &json!({
                "success": false,
                "verified": false,
                "message": "Please provide the 4-digit security PIN."
            }),
        ));
    };

    let Some(customer_id) = customer_id_arg(inv) else {
        return Ok(ToolResults::reply(
            &inv.tool_call_id,
            &json!({
                "success": false,
                "verified": false,
                "message": "Please look up the customer first before verifying PIN."
            }),
        ));
    };

    let Some(customer) = db::pink::get_customer(&state.db, customer_id).await? else {
        return Ok(ToolResults::reply(
            &inv.tool_call_id,
            &json!({
                "success": false,
                "verified": false,
                "message": "Customer not found. Please look up the customer again."
            }),
        ));
    };

    if pins_match(&pin, customer.pin.as_deref().unwrap_or("")) {
        Ok(ToolResults::reply(
            &inv.tool_call_id,
            &json!({
                "success": true,
                "verified": true,
                "customerId": customer.id,
                "customerName": customer.name,
                "message": format!(
                    "PIN verified. Identity confirmed for {}. You can now help with their account.",
                    customer.name
                )
            }),
        ))
    } else {
        Ok(ToolResults::reply(
            &inv.tool_call_id,
            &json!({
                "success": false,
                "verified": false,
                "message": "That PIN doesn't match our records. Please ask the customer to try again."
            }),
        ))
    }
}

pub async fn account_info(State(state): State<Arc<AppState>>, Json(body): Json<Value>) -> Response {
    let inv = ToolInvocation::from_body(body);
    let outcome = account_info_inner(&state, &inv).await;
    respond(
        &inv,
        outcome,
        "I'm having trouble accessing account information. Please try again.",
    )
}

async fn account_info_inner(
    state: &AppState,
    inv: &ToolInvocation,
) -> Result<ToolResults, AppError> {
    let Some(customer_id) = customer_id_arg(inv) else {
        return Ok(ToolResults::reply(
            &inv.tool_call_id,
            &json!({
                "success": false,
                "message": "Please verify the customer first before getting account info."
            }),
        ));
    };

    let Some(customer) = db::pink::get_customer(&state.db, customer_id).await? else {
        return Ok(ToolResults::reply(
            &inv.tool_call_id,
            &json!({
                "success": false,
                "message": "Customer not found. Please look up the customer again."
            }),
        ));
    };

    let lines = db::pink::get_lines(&state.db, customer_id).await?;
    let total_lines = lines.len() as i64;
    let lines_needed = lines_needed_for_free_ipad(total_lines);

    let line_descriptions = lines
        .iter()
        .map(|l| {
            format!(
                "{} ({})",
                l.device.as_deref().unwrap_or(&l.line_type),
                l.phone_number.as_deref().unwrap_or("unassigned")
            )
        })
        .collect::<Vec<_>>()
        .join(", ");

    let monthly_bill: f64 = lines.iter().map(|l| l.billed_price()).sum();

    let mut summary = format!(
        "{} has {} line{}: {}. Monthly bill: ${}.",
        customer.name,
        total_lines,
        if total_lines != 1 { "s" } else { "" },
        if line_descriptions.is_empty() {
            "none"
        } else {
            line_descriptions.as_str()
        },
        monthly_bill
    );
    if let Some(needed) = lines_needed {
        summary.push_str(&format!(
            " Add {} more line{} to get a FREE iPad!",
            needed,
            if needed > 1 { "s" } else { "" }
        ));
    }

    Ok(ToolResults::reply(
        &inv.tool_call_id,
        &json!({
            "success": true,
            "customer": {
                "id": customer.id,
                "name": customer.name,
                "phone": customer.phone,
                "email": customer.email,
                "address": customer.address
            },
            "lines": lines.iter().map(|l| json!({
                "device": l.device,
                "type": l.line_type,
                "phoneNumber": l.phone_number,
                "monthlyPrice": l.monthly_price
            })).collect::<Vec<_>>(),
            "totalLines": total_lines,
            "monthlyBill": monthly_bill,
            "promoEligible": lines_needed.is_some(),
            "linesNeededForPromo": crate::pink::FREE_IPAD_LINE_REQUIREMENT - total_lines,
            "message": summary
        }),
    ))
}

pub async fn add_line(State(state): State<Arc<AppState>>, Json(body): Json<Value>) -> Response {
    let inv = ToolInvocation::from_body(body);
    let outcome = add_line_inner(&state, &inv).await;
    respond(
        &inv,
        outcome,
        "I'm having trouble adding the line right now. Please try again.",
    )
}

async fn add_line_inner(state: &AppState, inv: &ToolInvocation) -> Result<ToolResults, AppError> {
    let Some(customer_id) = customer_id_arg(inv) else {
        return Ok(ToolResults::reply(
            &inv.tool_call_id,
            &json!({
                "success": false,
                "message": "I need to verify your account first before adding a new line. What's the phone number on your account?"
            }),
        ));
    };

    let line_type = LineType::classify(
        &inv.str_arg(&["lineType", "line_type", "type"])
            .unwrap_or_else(|| "phone".to_string()),
    );
    let device = inv
        .str_arg(&["deviceType", "device_type", "device"])
        .unwrap_or_else(|| line_type.default_device().to_string());
    let quantity = inv.i64_arg(&["quantity"]).unwrap_or(1).max(1);
    let monthly_price = line_type.monthly_price();

    let mut added = Vec::new();
    for _ in 0..quantity {
        let suffix: u32 = rand::thread_rng().gen_range(1000..10000);
        let phone_number = format!("+1-555-{suffix}");
        let line = db::pink::add_line(
            &state.db,
            customer_id,
            line_type.as_str(),
            &device,
            &phone_number,
            monthly_price,
        )
        .await?;
        added.push(line);
    }

    let pending = db::pink::get_pending_lines(&state.db, customer_id).await?;
    let total_pending = pending.len() as i64;
    let total_new_monthly: f64 = pending.iter().map(|l| l.billed_price()).sum();

    log_action(
        state,
        &customer_id.to_string(),
        "add_line",
        json!({
            "lineType": line_type.as_str(),
            "device": device,
            "quantity": quantity,
            "monthlyPrice": monthly_price
        }),
    )
    .await;

    let promo_message = if total_pending >= 2 {
        " With this addition, you may qualify for our 5-Line Free iPad promotion!"
    } else {
        ""
    };
    let device_name = if quantity > 1 {
        format!("{quantity} new {device} lines")
    } else {
        format!("a new {device} line")
    };

    Ok(ToolResults::reply(
        &inv.tool_call_id,
        &json!({
            "success": true,
            "lineAdded": true,
            "lines": added,
            "pendingLines": pending,
            "totalPendingLines": total_pending,
            "totalNewMonthlyCharge": total_new_monthly,
            "pricing": {
                "lineType": line_type.as_str(),
                "monthlyPrice": monthly_price,
                "totalForNewLines": total_new_monthly
            },
            "message": format!(
                "I've added {device_name} to your account. The {} line is {} dollars per month.{promo_message} Would you like to add anything else?",
                line_type.as_str(),
                monthly_price
            )
        }),
    ))
}

pub async fn apply_promo(State(state): State<Arc<AppState>>, Json(body): Json<Value>) -> Response {
    let inv = ToolInvocation::from_body(body);
    let outcome = apply_promo_inner(&state, &inv).await;
    respond(
        &inv,
        outcome,
        "I'm having trouble applying the promotion right now. Please try again.",
    )
}

async fn apply_promo_inner(state: &AppState, inv: &ToolInvocation) -> Result<ToolResults, AppError> {
    let Some(customer_id) = customer_id_arg(inv) else {
        return Ok(ToolResults::reply(
            &inv.tool_call_id,
            &json!({
                "success": false,
                "message": "I need to verify your account first before applying promotions."
            }),
        ));
    };

    let promo_id = inv
        .str_arg(&["promoId", "promo_id", "promo"])
        .unwrap_or_else(|| "5-line-ipad".to_string());
    let total_lines = inv.i64_arg(&["totalLines", "total_lines"]).unwrap_or(0);
    let shipping_address = inv.str_arg(&["shippingAddress", "shipping_address", "address"]);

    let Some(promo) = find_promo(&promo_id) else {
        return Ok(ToolResults::reply(
            &inv.tool_call_id,
            &json!({
                "success": false,
                "message": "I couldn't find that promotion. Let me tell you about our current offers..."
            }),
        ));
    };

    if total_lines < promo.requirement {
        let lines_needed = promo.requirement - total_lines;
        return Ok(ToolResults::reply(
            &inv.tool_call_id,
            &json!({
                "success": false,
                "eligible": false,
                "promoId": promo.id,
                "promoName": promo.name,
                "requirement": promo.requirement,
                "currentLines": total_lines,
                "linesNeeded": lines_needed,
                "message": format!(
                    "You need {} more line{} to qualify for the {}. Would you like to add more lines?",
                    lines_needed,
                    if lines_needed > 1 { "s" } else { "" },
                    promo.name
                )
            }),
        ));
    }

    let applied = json!({
        "promoId": promo.id,
        "promoName": promo.name,
        "benefit": promo.benefit,
        "appliedAt": Utc::now().to_rfc3339(),
        "shippingAddress": shipping_address.as_deref().unwrap_or("To be confirmed"),
        "estimatedDelivery": "3-5 business days"
    });

    log_action(state, &customer_id.to_string(), "apply_promo", applied.clone()).await;

    let message = if promo.id == "5-line-ipad" {
        match shipping_address.as_deref() {
            Some(address) => format!(
                "I've applied the {}. Your free iPad will be shipped to {address} and should arrive in 3 to 5 business days.",
                promo.name
            ),
            None => format!(
                "I've applied the {}. Your free iPad is ready to ship. Should I send it to your address on file?",
                promo.name
            ),
        }
    } else {
        format!("I've applied the {} to your account. {}", promo.name, promo.benefit)
    };

    Ok(ToolResults::reply(
        &inv.tool_call_id,
        &json!({
            "success": true,
            "promoApplied": true,
            "promo": applied,
            "message": message
        }),
    ))
}

pub async fn roaming_pass(State(state): State<Arc<AppState>>, Json(body): Json<Value>) -> Response {
    let inv = ToolInvocation::from_body(body);
    let outcome = roaming_pass_inner(&state, &inv).await;
    respond(
        &inv,
        outcome,
        "I'm having trouble setting up the roaming pass right now. Please try again.",
    )
}

async fn roaming_pass_inner(
    state: &AppState,
    inv: &ToolInvocation,
) -> Result<ToolResults, AppError> {
    let Some(customer_id) = customer_id_arg(inv) else {
        return Ok(ToolResults::reply(
            &inv.tool_call_id,
            &json!({
                "success": false,
                "message": "I need to verify your account first before setting up roaming."
            }),
        ));
    };

    let destination = inv
        .str_arg(&["destination", "region", "country"])
        .unwrap_or_else(|| "Europe".to_string());
    let start_date = inv.str_arg(&["startDate", "start_date", "departureDate"]);
    let end_date = inv.str_arg(&["endDate", "end_date", "returnDate"]);
    let activate = inv.bool_arg(&["activate"]) != Some(false);

    let pass = select_roaming_pass(&destination);

    let parse_date = |raw: &str| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok();
    let (days, estimated_cost) = match (
        start_date.as_deref().and_then(parse_date),
        end_date.as_deref().and_then(parse_date),
    ) {
        (Some(start), Some(end)) => {
            let days = travel_days(start, end);
            (Some(days), Some(days * pass.daily_rate))
        }
        _ => (None, None),
    };

    let roaming = json!({
        "passId": pass.id,
        "passName": pass.name,
        "destination": destination,
        "dailyRate": pass.daily_rate,
        "features": pass.features,
        "autoStop": true,
        "startDate": start_date.as_deref().unwrap_or("When you arrive"),
        "endDate": end_date.as_deref().unwrap_or("When you return"),
        "travelDays": days,
        "estimatedMaxCost": estimated_cost,
        "activatedAt": activate.then(|| Utc::now().to_rfc3339()),
        "status": if activate { "active" } else { "pending" }
    });

    log_action(state, &customer_id.to_string(), "roaming_pass", roaming.clone()).await;

    let message = if activate {
        let mut message = format!("Done! Your {} is now active. ", pass.name);
        if let (Some(start), Some(end)) = (start_date.as_deref(), end_date.as_deref()) {
            message.push_str(&format!("It covers {start} to {end}. "));
        }
        message.push_str(&format!(
            "You'll be charged {} dollars per day only on days your phone connects to a {destination} network. ",
            pass.daily_rate
        ));
        message.push_str("The pass stops automatically when you return home - no action needed from you.");
        message
    } else {
        format!(
            "The {} gives you unlimited voice and text for {} dollars per day. You're only charged on days you actually roam. Would you like me to activate it?",
            pass.name, pass.daily_rate
        )
    };

    Ok(ToolResults::reply(
        &inv.tool_call_id,
        &json!({
            "success": true,
            "passActivated": activate,
            "roamingPass": roaming,
            "message": message
        }),
    ))
}

pub async fn create_ticket(State(state): State<Arc<AppState>>, Json(body): Json<Value>) -> Response {
    let inv = ToolInvocation::from_body(body);
    let outcome = create_ticket_inner(&state, &inv).await;
    respond(&inv, outcome, "I couldn't create the ticket record.")
}

/// Normalize an argument that may be a single string or a string array.
fn string_list(value: Option<Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Some(Value::String(s)) => vec![s],
        _ => Vec::new(),
    }
}

async fn create_ticket_inner(
    state: &AppState,
    inv: &ToolInvocation,
) -> Result<ToolResults, AppError> {
    let customer_id = inv.str_arg(&["customerId", "customer_id"]);
    let customer_name = inv
        .str_arg(&["customerName", "customer_name"])
        .unwrap_or_else(|| "Unknown".to_string());
    let channel = inv.str_arg(&["channel"]).unwrap_or_else(|| "voice".to_string());
    let intents = string_list(inv.value_arg(&["intentsDetected", "intents_detected", "intents"]));
    let actions = string_list(inv.value_arg(&["actionsTaken", "actions_taken", "actions"]));
    let financial_impact = inv.str_arg(&["financialImpact", "financial_impact", "mrr"]);
    let escalated = inv.bool_arg(&["escalated"]).unwrap_or(false);

    let resolution = if escalated {
        "Escalated to Contact Centre".to_string()
    } else {
        inv.str_arg(&["resolution"])
            .unwrap_or_else(|| "Completed by AI".to_string())
    };
    let summary = inv
        .str_arg(&["summary"])
        .unwrap_or_else(|| summarize_ticket(&intents, &actions, financial_impact.as_deref()));
    let status = if escalated { "escalated" } else { "completed" };

    let ticket_number: u32 = rand::thread_rng().gen_range(1000..10000);
    let ticket_id = format!("PMK-{ticket_number}");

    if let Err(e) = db::ai_log::insert_ticket(
        &state.db,
        &ticket_id,
        customer_id.as_deref(),
        &customer_name,
        &channel,
        &json!(intents),
        &json!(actions),
        financial_impact.as_deref(),
        &resolution,
        &summary,
        escalated,
        status,
    )
    .await
    {
        tracing::warn!("Could not save ticket {ticket_id}: {e}");
    }

    Ok(ToolResults::reply(
        &inv.tool_call_id,
        &json!({
            "success": true,
            "ticketCreated": true,
            "ticket": {
                "ticketId": ticket_id,
                "customerId": customer_id,
                "customerName": customer_name,
                "channel": channel,
                "intentsDetected": intents,
                "actionsTaken": actions,
                "financialImpact": financial_impact,
                "resolution": resolution,
                "summary": summary,
                "escalated": escalated,
                "createdAt": Utc::now().to_rfc3339(),
                "status": status
            },
            "message": format!("Ticket {ticket_id} has been created for this interaction.")
        }),
    ))
}

pub async fn transfer(State(state): State<Arc<AppState>>, Json(body): Json<Value>) -> Response {
    let inv = ToolInvocation::from_body(body);
    let outcome = transfer_inner(&state, &inv).await;
    respond(
        &inv,
        outcome,
        "I'm having trouble connecting you to an agent. Please try calling back.",
    )
}

async fn transfer_inner(state: &AppState, inv: &ToolInvocation) -> Result<ToolResults, AppError> {
    let customer_id = inv.str_arg(&["customerId", "customer_id"]);
    let customer_name = inv.str_arg(&["customerName", "customer_name"]);
    let customer_phone = inv
        .str_arg(&["customerPhone", "customer_phone"])
        .or_else(|| inv.platform_caller_number());
    let reason = inv
        .str_arg(&["reason", "transferReason"])
        .unwrap_or_else(|| "Customer requested human agent".to_string());
    let context = inv
        .value_arg(&["context", "callContext"])
        .unwrap_or_else(|| json!({}));
    let call_id = inv.platform_call_id().or_else(|| inv.str_arg(&["callId"]));

    let escalation_id = format!("ESC-{}", Utc::now().timestamp_millis());
    let transfer_to = &state.config.contact_centre_number;

    if let Err(e) = db::ai_log::insert_escalation(
        &state.db,
        &escalation_id,
        customer_id.as_deref(),
        customer_name.as_deref(),
        customer_phone.as_deref(),
        &reason,
        &context,
        call_id.as_deref(),
        transfer_to,
    )
    .await
    {
        tracing::warn!("Could not log escalation {escalation_id}: {e}");
    }

    if let Some(customer_id) = customer_id.as_deref() {
        if let Err(e) = db::ai_log::escalate_active_sessions(&state.db, customer_id, &reason).await
        {
            tracing::warn!("Could not escalate active sessions: {e}");
        }
    }

    // Ringing call row so the contact centre dashboard sees the handoff.
    let notes = format!(
        "Escalated from AI: {reason}. Customer: {}",
        customer_name.as_deref().unwrap_or("Unknown")
    );
    let metadata = json!({
        "escalationId": escalation_id,
        "fromAI": true,
        "context": context
    });
    if let Err(e) =
        db::calls::create_escalation(&state.db, customer_phone.as_deref(), &notes, metadata).await
    {
        tracing::warn!("Could not create escalation call record: {e}");
    }

    Ok(
        ToolResults::plain_reply(
            &inv.tool_call_id,
            format!("Transferring to human agent. Reason: {reason}"),
        )
        .with_destination(TransferDestination {
            kind: "number",
            number: transfer_to.clone(),
            message: "Please hold while I connect you with a specialist.".to_string(),
            description: format!("Escalation: {reason}"),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_list_accepts_array_or_single_value() {
        assert_eq!(
            string_list(Some(json!(["billing", "roaming"]))),
            vec!["billing".to_string(), "roaming".to_string()]
        );
        assert_eq!(string_list(Some(json!("billing"))), vec!["billing".to_string()]);
        assert!(string_list(None).is_empty());
        assert!(string_list(Some(json!(42))).is_empty());
    }

    #[test]
    fn customer_id_requires_a_uuid() {
        let id = Uuid::new_v4();
        let inv = ToolInvocation::from_body(json!({ "customerId": id.to_string() }));
        assert_eq!(customer_id_arg(&inv), Some(id));

        let inv = ToolInvocation::from_body(json!({ "customer_id": "not-a-uuid" }));
        assert_eq!(customer_id_arg(&inv), None);
    }
}
