use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use delivery_dispatch::api::rest::router;
use delivery_dispatch::config::AssignmentSettings;
use delivery_dispatch::engine::dispatch::run_dispatch_engine;
use delivery_dispatch::state::AppState;
use serde_json::{Value, json};
use tower::ServiceExt;

fn setup() -> axum::Router {
    let (state, rx) = AppState::new(AssignmentSettings::default(), 1024, 1024);
    let shared = Arc::new(state);
    tokio::spawn(run_dispatch_engine(shared.clone(), rx));
    router(shared)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn actor_request(method: &str, uri: &str, actor: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-actor-role", actor)
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn create_rider(app: &axum::Router, name: &str, lat: f64, lng: f64, batch: u8) -> Value {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/riders",
            json!({
                "name": name,
                "location": { "lat": lat, "lng": lng },
                "rating": 4.5,
                "max_batch_size": batch
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await
}

async fn create_order(app: &axum::Router, vendor_id: &str, batch_eligible: bool) -> Value {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/orders",
            json!({
                "vendor_id": vendor_id,
                "customer_id": uuid::Uuid::new_v4(),
                "vendor_location": { "lat": 52.52, "lng": 13.405 },
                "dropoff": { "lat": 52.54, "lng": 13.42 },
                "items": [
                    { "product_id": uuid::Uuid::new_v4(), "quantity": 1, "unit_price": 9.0 },
                    { "product_id": uuid::Uuid::new_v4(), "quantity": 2, "unit_price": 4.5 },
                    { "product_id": uuid::Uuid::new_v4(), "quantity": 1, "unit_price": 3.0 }
                ],
                "is_batch_eligible": batch_eligible
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await
}

async fn set_status(app: &axum::Router, order_id: &str, actor: &str, target: &str) -> axum::response::Response {
    app.clone()
        .oneshot(actor_request(
            "POST",
            &format!("/orders/{order_id}/status"),
            actor,
            json!({ "target": target }),
        ))
        .await
        .unwrap()
}

/// Confirms the order and walks every ticket item to Done; the order
/// reaches ReadyForPickup through the kitchen, not through status calls.
async fn drive_to_ready(app: &axum::Router, order_id: &str) {
    let res = set_status(app, order_id, "customer", "Confirmed").await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(get_request(&format!("/orders/{order_id}/ticket")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let ticket = body_json(res).await;
    let ticket_id = ticket["id"].as_str().unwrap().to_string();
    let item_count = ticket["items"].as_array().unwrap().len();

    for target in ["Cooking", "Done"] {
        for index in 0..item_count {
            let res = app
                .clone()
                .oneshot(json_request(
                    "POST",
                    &format!("/tickets/{ticket_id}/items/{index}"),
                    json!({ "target": target }),
                ))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::OK);
        }
    }
}

async fn pending_offers(app: &axum::Router) -> Vec<Value> {
    let res = app.clone().oneshot(get_request("/offers")).await.unwrap();
    let offers = body_json(res).await;
    offers
        .as_array()
        .unwrap()
        .iter()
        .filter(|offer| offer["outcome"] == "Pending")
        .cloned()
        .collect()
}

async fn respond_to_offer(app: &axum::Router, offer_id: &str, accept: bool) -> axum::response::Response {
    app.clone()
        .oneshot(json_request(
            "POST",
            &format!("/offers/{offer_id}/respond"),
            json!({ "accept": accept }),
        ))
        .await
        .unwrap()
}

async fn settle() {
    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;
}

#[tokio::test]
async fn health_returns_ok() {
    let app = setup();
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["orders"], 0);
    assert_eq!(body["riders"], 0);
    assert_eq!(body["offers"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let app = setup();
    let response = app.oneshot(get_request("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("dispatch_queue_depth"));
}

#[tokio::test]
async fn create_rider_validates_input() {
    let app = setup();

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/riders",
            json!({
                "name": "  ",
                "location": { "lat": 52.52, "lng": 13.405 },
                "rating": 4.5,
                "max_batch_size": 2
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/riders",
            json!({
                "name": "Maya",
                "location": { "lat": 52.52, "lng": 13.405 },
                "rating": 9.9,
                "max_batch_size": 0
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/riders",
            json!({
                "name": "Maya",
                "location": { "lat": 52.52, "lng": 13.405 },
                "rating": 9.9,
                "max_batch_size": 2
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let rider = body_json(res).await;
    assert_eq!(rider["rating"], 5.0);
    assert_eq!(rider["online"], true);
    assert_eq!(rider["available"], true);
}

#[tokio::test]
async fn create_order_starts_pending_with_history() {
    let app = setup();
    let order = create_order(&app, &uuid::Uuid::new_v4().to_string(), false).await;

    assert_eq!(order["status"], "Pending");
    assert!(order["rider_id"].is_null());
    assert_eq!(order["version"], 0);
    assert_eq!(order["status_history"].as_array().unwrap().len(), 1);
    assert_eq!(order["needs_manual_assignment"], false);
}

#[tokio::test]
async fn status_update_requires_actor_header() {
    let app = setup();
    let order = create_order(&app, &uuid::Uuid::new_v4().to_string(), false).await;
    let order_id = order["id"].as_str().unwrap();

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/status"),
            json!({ "target": "Confirmed" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn illegal_transition_returns_422() {
    let app = setup();
    let order = create_order(&app, &uuid::Uuid::new_v4().to_string(), false).await;
    let order_id = order["id"].as_str().unwrap();

    let res = set_status(&app, order_id, "rider", "PickedUp").await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let res = set_status(&app, order_id, "vendor", "Preparing").await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn stale_version_returns_conflict() {
    let app = setup();
    let order = create_order(&app, &uuid::Uuid::new_v4().to_string(), false).await;
    let order_id = order["id"].as_str().unwrap();

    let res = set_status(&app, order_id, "customer", "Confirmed").await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(actor_request(
            "POST",
            &format!("/orders/{order_id}/status"),
            "vendor",
            json!({ "target": "Preparing", "expected_version": 0 }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn kitchen_completion_readies_the_order_without_status_calls() {
    let app = setup();
    let order = create_order(&app, &uuid::Uuid::new_v4().to_string(), false).await;
    let order_id = order["id"].as_str().unwrap().to_string();

    drive_to_ready(&app, &order_id).await;

    let res = app
        .clone()
        .oneshot(get_request(&format!("/orders/{order_id}")))
        .await
        .unwrap();
    let order = body_json(res).await;
    assert_eq!(order["status"], "ReadyForPickup");

    let statuses: Vec<&str> = order["status_history"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["status"].as_str().unwrap())
        .collect();
    assert_eq!(
        statuses,
        vec!["Pending", "Confirmed", "Preparing", "ReadyForPickup"]
    );
}

#[tokio::test]
async fn full_delivery_flow() {
    let app = setup();
    let rider = create_rider(&app, "Dispatch Dan", 52.52, 13.405, 2).await;
    let rider_id = rider["id"].as_str().unwrap().to_string();

    let order = create_order(&app, &uuid::Uuid::new_v4().to_string(), false).await;
    let order_id = order["id"].as_str().unwrap().to_string();

    drive_to_ready(&app, &order_id).await;
    settle().await;

    let offers = pending_offers(&app).await;
    assert_eq!(offers.len(), 1);
    assert_eq!(offers[0]["rider_id"], rider_id.as_str());
    assert_eq!(offers[0]["order_id"], order_id.as_str());
    assert_eq!(offers[0]["attempt_number"], 1);

    let offer_id = offers[0]["id"].as_str().unwrap();
    let res = respond_to_offer(&app, offer_id, true).await;
    assert_eq!(res.status(), StatusCode::OK);
    let resolved = body_json(res).await;
    assert_eq!(resolved["outcome"], "Accepted");

    let res = app
        .clone()
        .oneshot(get_request(&format!("/orders/{order_id}")))
        .await
        .unwrap();
    let order = body_json(res).await;
    assert_eq!(order["status"], "Assigned");
    assert_eq!(order["rider_id"], rider_id.as_str());

    for target in ["PickedUp", "OutForDelivery", "Delivered"] {
        let res = set_status(&app, &order_id, "rider", target).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    let res = app
        .clone()
        .oneshot(get_request(&format!("/orders/{order_id}")))
        .await
        .unwrap();
    let order = body_json(res).await;
    assert_eq!(order["status"], "Delivered");
    assert!(order["rider_id"].is_null());
    assert_eq!(order["status_history"].as_array().unwrap().len(), 8);

    let res = app.clone().oneshot(get_request("/riders")).await.unwrap();
    let riders = body_json(res).await;
    let rider = &riders.as_array().unwrap()[0];
    assert_eq!(rider["active_order_ids"].as_array().unwrap().len(), 0);
    assert_eq!(rider["available"], true);
}

#[tokio::test]
async fn zero_riders_parks_order_for_manual_assignment() {
    let app = setup();
    let order = create_order(&app, &uuid::Uuid::new_v4().to_string(), false).await;
    let order_id = order["id"].as_str().unwrap().to_string();

    drive_to_ready(&app, &order_id).await;
    settle().await;

    let res = app
        .clone()
        .oneshot(get_request(&format!("/orders/{order_id}")))
        .await
        .unwrap();
    let order = body_json(res).await;
    assert_eq!(order["status"], "ReadyForPickup");
    assert_eq!(order["needs_manual_assignment"], true);

    let res = app.clone().oneshot(get_request("/offers")).await.unwrap();
    let offers = body_json(res).await;
    assert_eq!(offers.as_array().unwrap().len(), 0);

    let res = app
        .clone()
        .oneshot(get_request("/orders?needs_manual=true"))
        .await
        .unwrap();
    let parked = body_json(res).await;
    assert_eq!(parked.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn rejection_moves_to_next_candidate_immediately() {
    let app = setup();
    let near = create_rider(&app, "Near Nia", 52.521, 13.406, 2).await;
    let far = create_rider(&app, "Far Felix", 52.58, 13.48, 2).await;
    let near_id = near["id"].as_str().unwrap().to_string();
    let far_id = far["id"].as_str().unwrap().to_string();

    let order = create_order(&app, &uuid::Uuid::new_v4().to_string(), false).await;
    let order_id = order["id"].as_str().unwrap().to_string();

    drive_to_ready(&app, &order_id).await;
    settle().await;

    let offers = pending_offers(&app).await;
    assert_eq!(offers.len(), 1);
    assert_eq!(offers[0]["rider_id"], near_id.as_str());

    let res = respond_to_offer(&app, offers[0]["id"].as_str().unwrap(), false).await;
    assert_eq!(res.status(), StatusCode::OK);
    settle().await;

    let offers = pending_offers(&app).await;
    assert_eq!(offers.len(), 1);
    assert_eq!(offers[0]["rider_id"], far_id.as_str());
    assert_eq!(offers[0]["attempt_number"], 2);

    let res = respond_to_offer(&app, offers[0]["id"].as_str().unwrap(), true).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(get_request(&format!("/orders/{order_id}")))
        .await
        .unwrap();
    let order = body_json(res).await;
    assert_eq!(order["status"], "Assigned");
    assert_eq!(order["rider_id"], far_id.as_str());
}

#[tokio::test]
async fn cancelling_order_resolves_pending_offer_without_retry() {
    let app = setup();
    create_rider(&app, "Waiting Wes", 52.52, 13.405, 2).await;

    let order = create_order(&app, &uuid::Uuid::new_v4().to_string(), false).await;
    let order_id = order["id"].as_str().unwrap().to_string();

    drive_to_ready(&app, &order_id).await;
    settle().await;
    assert_eq!(pending_offers(&app).await.len(), 1);

    let res = set_status(&app, &order_id, "vendor", "Cancelled").await;
    assert_eq!(res.status(), StatusCode::OK);
    settle().await;

    assert_eq!(pending_offers(&app).await.len(), 0);
    let res = app.clone().oneshot(get_request("/offers")).await.unwrap();
    let offers = body_json(res).await;
    assert_eq!(offers.as_array().unwrap().len(), 1);
    assert_eq!(offers.as_array().unwrap()[0]["outcome"], "Expired");

    let res = app
        .clone()
        .oneshot(get_request(&format!("/orders/{order_id}")))
        .await
        .unwrap();
    let order = body_json(res).await;
    assert_eq!(order["status"], "Cancelled");
    assert!(order["rider_id"].is_null());
}

#[tokio::test]
async fn force_assign_recovers_a_parked_order() {
    let app = setup();
    let order = create_order(&app, &uuid::Uuid::new_v4().to_string(), false).await;
    let order_id = order["id"].as_str().unwrap().to_string();

    drive_to_ready(&app, &order_id).await;
    settle().await;

    let rider = create_rider(&app, "Backup Bo", 52.52, 13.405, 2).await;
    let rider_id = rider["id"].as_str().unwrap().to_string();

    let res = app
        .clone()
        .oneshot(actor_request(
            "POST",
            &format!("/orders/{order_id}/force-assign"),
            "vendor",
            json!({ "rider_id": rider_id }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .clone()
        .oneshot(actor_request(
            "POST",
            &format!("/orders/{order_id}/force-assign"),
            "admin",
            json!({ "rider_id": rider_id }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let order = body_json(res).await;
    assert_eq!(order["status"], "Assigned");
    assert_eq!(order["rider_id"], rider_id.as_str());
    assert_eq!(order["needs_manual_assignment"], false);
}

#[tokio::test]
async fn force_assign_moves_an_assigned_order_to_a_new_rider() {
    let app = setup();
    let first = create_rider(&app, "First Fay", 52.52, 13.405, 2).await;
    let first_id = first["id"].as_str().unwrap().to_string();

    let order = create_order(&app, &uuid::Uuid::new_v4().to_string(), false).await;
    let order_id = order["id"].as_str().unwrap().to_string();

    drive_to_ready(&app, &order_id).await;
    settle().await;

    let offers = pending_offers(&app).await;
    assert_eq!(offers.len(), 1);
    let res = respond_to_offer(&app, offers[0]["id"].as_str().unwrap(), true).await;
    assert_eq!(res.status(), StatusCode::OK);

    let second = create_rider(&app, "Second Sol", 52.53, 13.41, 2).await;
    let second_id = second["id"].as_str().unwrap().to_string();

    let res = app
        .clone()
        .oneshot(actor_request(
            "POST",
            &format!("/orders/{order_id}/force-assign"),
            "admin",
            json!({ "rider_id": second_id }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let order = body_json(res).await;
    assert_eq!(order["status"], "Assigned");
    assert_eq!(order["rider_id"], second_id.as_str());

    // One rider at a time: the first is released the moment the second
    // is claimed.
    let res = app.clone().oneshot(get_request("/riders")).await.unwrap();
    let riders = body_json(res).await;
    for rider in riders.as_array().unwrap() {
        let load = rider["active_order_ids"].as_array().unwrap().len();
        if rider["id"] == first_id.as_str() {
            assert_eq!(load, 0);
            assert_eq!(rider["available"], true);
        } else {
            assert_eq!(load, 1);
        }
    }

    let res = set_status(&app, &order_id, "admin", "Cancelled").await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = app.clone().oneshot(get_request("/riders")).await.unwrap();
    let riders = body_json(res).await;
    for rider in riders.as_array().unwrap() {
        assert_eq!(rider["active_order_ids"].as_array().unwrap().len(), 0);
    }
}

#[tokio::test]
async fn settings_roundtrip_and_disabled_dispatch() {
    let app = setup();

    let res = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/settings/assignment",
            json!({
                "enabled": true,
                "max_distance_km": -1.0,
                "max_wait_time_secs": 30,
                "prioritize_rating": false,
                "prioritize_proximity": true,
                "allow_batching": false,
                "batch_window_secs": 300,
                "max_assignment_attempts": 3,
                "distance_bucket_km": 0.5
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/settings/assignment",
            json!({
                "enabled": false,
                "max_distance_km": 5.0,
                "max_wait_time_secs": 20,
                "prioritize_rating": true,
                "prioritize_proximity": false,
                "allow_batching": false,
                "batch_window_secs": 300,
                "max_assignment_attempts": 2,
                "distance_bucket_km": 1.0
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(get_request("/settings/assignment"))
        .await
        .unwrap();
    let settings = body_json(res).await;
    assert_eq!(settings["enabled"], false);
    assert_eq!(settings["max_distance_km"], 5.0);

    create_rider(&app, "Idle Ida", 52.52, 13.405, 2).await;
    let order = create_order(&app, &uuid::Uuid::new_v4().to_string(), false).await;
    let order_id = order["id"].as_str().unwrap().to_string();

    drive_to_ready(&app, &order_id).await;
    settle().await;

    let res = app
        .clone()
        .oneshot(get_request(&format!("/orders/{order_id}")))
        .await
        .unwrap();
    let order = body_json(res).await;
    assert_eq!(order["needs_manual_assignment"], true);
    assert_eq!(pending_offers(&app).await.len(), 0);
}

#[tokio::test]
async fn expired_offer_retries_until_candidates_exhaust() {
    let app = setup();

    let res = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/settings/assignment",
            json!({
                "enabled": true,
                "max_distance_km": 10.0,
                "max_wait_time_secs": 1,
                "prioritize_rating": false,
                "prioritize_proximity": true,
                "allow_batching": false,
                "batch_window_secs": 300,
                "max_assignment_attempts": 3,
                "distance_bucket_km": 0.5
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    create_rider(&app, "Silent Sam", 52.52, 13.405, 2).await;
    let order = create_order(&app, &uuid::Uuid::new_v4().to_string(), false).await;
    let order_id = order["id"].as_str().unwrap().to_string();

    drive_to_ready(&app, &order_id).await;
    settle().await;
    assert_eq!(pending_offers(&app).await.len(), 1);

    // Let the single offer expire; the only candidate is then exhausted.
    tokio::time::sleep(tokio::time::Duration::from_millis(1_500)).await;

    let res = app.clone().oneshot(get_request("/offers")).await.unwrap();
    let offers = body_json(res).await;
    assert_eq!(offers.as_array().unwrap().len(), 1);
    assert_eq!(offers.as_array().unwrap()[0]["outcome"], "Expired");

    let res = app
        .clone()
        .oneshot(get_request(&format!("/orders/{order_id}")))
        .await
        .unwrap();
    let order = body_json(res).await;
    assert_eq!(order["status"], "ReadyForPickup");
    assert_eq!(order["needs_manual_assignment"], true);
}

#[tokio::test]
async fn batching_prefers_compatible_rider_en_route() {
    let app = setup();

    let res = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/settings/assignment",
            json!({
                "enabled": true,
                "max_distance_km": 10.0,
                "max_wait_time_secs": 30,
                "prioritize_rating": false,
                "prioritize_proximity": true,
                "allow_batching": true,
                "batch_window_secs": 300,
                "max_assignment_attempts": 3,
                "distance_bucket_km": 0.5
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let vendor_id = uuid::Uuid::new_v4().to_string();

    // En-route rider: capacity 2, currently carrying one order from the
    // same vendor.
    let en_route = create_rider(&app, "Batching Bea", 52.53, 13.42, 2).await;
    let en_route_id = en_route["id"].as_str().unwrap().to_string();

    let first = create_order(&app, &vendor_id, true).await;
    let first_id = first["id"].as_str().unwrap().to_string();
    drive_to_ready(&app, &first_id).await;
    settle().await;

    let offers = pending_offers(&app).await;
    assert_eq!(offers.len(), 1);
    respond_to_offer(&app, offers[0]["id"].as_str().unwrap(), true).await;
    let res = set_status(&app, &first_id, "rider", "PickedUp").await;
    assert_eq!(res.status(), StatusCode::OK);

    // A rider at full capacity is excluded from the candidate set
    // entirely: fill Fran up before the batch-eligible order arrives.
    let full = create_rider(&app, "Full Fran", 52.52, 13.405, 1).await;
    let full_id = full["id"].as_str().unwrap().to_string();
    let busy = create_order(&app, &uuid::Uuid::new_v4().to_string(), false).await;
    let busy_id = busy["id"].as_str().unwrap().to_string();
    drive_to_ready(&app, &busy_id).await;
    settle().await;
    let offers = pending_offers(&app).await;
    let busy_offer = offers
        .iter()
        .find(|offer| offer["order_id"] == busy_id.as_str())
        .unwrap();
    assert_eq!(busy_offer["rider_id"], full_id.as_str());
    let res = respond_to_offer(&app, busy_offer["id"].as_str().unwrap(), true).await;
    assert_eq!(res.status(), StatusCode::OK);

    // An idle rider sitting right at the vendor would win on proximity
    // alone; batching preference must outrank it.
    create_rider(&app, "Idle Igor", 52.52, 13.405, 2).await;

    let second = create_order(&app, &vendor_id, true).await;
    let second_id = second["id"].as_str().unwrap().to_string();
    drive_to_ready(&app, &second_id).await;
    settle().await;

    let offers = pending_offers(&app).await;
    let second_offer = offers
        .iter()
        .find(|offer| offer["order_id"] == second_id.as_str())
        .unwrap();
    assert_eq!(second_offer["rider_id"], en_route_id.as_str());
}
