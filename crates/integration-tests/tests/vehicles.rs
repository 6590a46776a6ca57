//! Entries, exits, the parked list and plate suggestions.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use chrono::TimeDelta;
use garagem_integration_tests::TestApp;
use serde_json::json;

#[tokio::test]
async fn test_entry_normalizes_and_rejects_duplicates() {
    let app = TestApp::new();
    let owner = app.register("Ana", "ana@garagem.app").await;
    let lot = app.create_lot(&owner, "Centro").await;
    let other = app.create_lot(&owner, "Norte").await;
    let uri = format!("/api/lots/{lot}/vehicles");

    let entry = app
        .post(&uri, &owner, json!({ "plate": " abc1d23 ", "driver": " José " }))
        .await;
    assert_eq!(entry.status, StatusCode::CREATED);
    assert_eq!(entry.json()["plate"], "ABC1D23");
    assert_eq!(entry.json()["driver"], "José");
    assert!(entry.json()["exit_time"].is_null());

    let duplicate = app
        .post(&uri, &owner, json!({ "plate": "ABC1D23", "driver": "Outro" }))
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);
    assert_eq!(
        duplicate.error(),
        "Este veículo (ABC1D23) já está neste estacionamento!"
    );

    // The same plate may be parked in another lot.
    app.enter(&owner, &other, "ABC1D23", "José").await;

    let blank_driver = app
        .post(&uri, &owner, json!({ "plate": "XYZ9876", "driver": "  " }))
        .await;
    assert_eq!(blank_driver.status, StatusCode::BAD_REQUEST);

    let blank_plate = app
        .post(&uri, &owner, json!({ "plate": "", "driver": "Lia" }))
        .await;
    assert_eq!(blank_plate.status, StatusCode::BAD_REQUEST);
    assert_eq!(blank_plate.error(), "Informe a placa do veículo");
}

#[tokio::test]
async fn test_exit_is_recorded_once() {
    let app = TestApp::new();
    let owner = app.register("Ana", "ana@garagem.app").await;
    let lot = app.create_lot(&owner, "Centro").await;
    let vehicle = app.enter(&owner, &lot, "ABC1D23", "José").await;

    app.clock.advance(TimeDelta::minutes(30));
    let exit_uri = format!("/api/vehicles/{vehicle}/exit");
    let exit = app.post(&exit_uri, &owner, json!({})).await;
    assert_eq!(exit.status, StatusCode::OK);
    let exit_time = exit.json()["exit_time"].clone();
    assert!(exit_time.is_string());

    app.clock.advance(TimeDelta::minutes(30));
    let again = app.post(&exit_uri, &owner, json!({})).await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);
    assert_eq!(again.error(), "A saída deste veículo já foi registrada");

    // Once closed, the plate can enter again.
    app.enter(&owner, &lot, "ABC1D23", "José").await;

    let unknown = app
        .post(
            "/api/vehicles/00000000-0000-4000-8000-000000000000/exit",
            &owner,
            json!({}),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
    assert_eq!(unknown.error(), "Veículo não encontrado");
}

#[tokio::test]
async fn test_parked_list_shows_elapsed_stay() {
    let app = TestApp::new();
    let owner = app.register("Ana", "ana@garagem.app").await;
    let lot = app.create_lot(&owner, "Centro").await;

    let gone = app.enter(&owner, &lot, "AAA1111", "Ana").await;
    app.post(&format!("/api/vehicles/{gone}/exit"), &owner, json!({}))
        .await;
    app.enter(&owner, &lot, "BBB2222", "Bia").await;
    app.clock.advance(TimeDelta::minutes(45));
    app.enter(&owner, &lot, "CCC3333", "Caio").await;
    app.clock.advance(TimeDelta::minutes(45));

    let parked = app.get(&format!("/api/lots/{lot}/vehicles"), &owner).await;
    assert_eq!(parked.status, StatusCode::OK);
    let rows = parked.json();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["plate"], "CCC3333");
    assert_eq!(rows[0]["duration"], "0h 45min");
    assert_eq!(rows[1]["plate"], "BBB2222");
    assert_eq!(rows[1]["duration"], "1h 30min");
    assert_eq!(rows[1]["parking_lot_name"], "Centro");
}

#[tokio::test]
async fn test_plate_suggestions() {
    let app = TestApp::new();
    let owner = app.register("Ana", "ana@garagem.app").await;
    let lot = app.create_lot(&owner, "Centro").await;

    for n in (1..=7).rev() {
        let id = app.enter(&owner, &lot, &format!("ABD000{n}"), "Motorista").await;
        app.post(&format!("/api/vehicles/{id}/exit"), &owner, json!({}))
            .await;
    }
    app.enter(&owner, &lot, "XYZ9876", "Lia").await;

    // Latest entry wins the driver name.
    let first = app.enter(&owner, &lot, "ABC1D23", "José").await;
    app.post(&format!("/api/vehicles/{first}/exit"), &owner, json!({}))
        .await;
    app.clock.advance(TimeDelta::minutes(5));
    app.enter(&owner, &lot, "ABC1D23", "Maria").await;

    let plates = app
        .get(&format!("/api/lots/{lot}/plates?prefix=ab"), &owner)
        .await
        .json();
    let plates = plates.as_array().unwrap();
    let names: Vec<&str> = plates.iter().map(|p| p["plate"].as_str().unwrap()).collect();
    assert_eq!(
        names,
        vec!["ABC1D23", "ABD0001", "ABD0002", "ABD0003", "ABD0004"]
    );
    assert_eq!(plates[0]["driver"], "Maria");

    let short = app
        .get(&format!("/api/lots/{lot}/plates?prefix=a"), &owner)
        .await
        .json();
    assert_eq!(short, json!([]));
}

#[tokio::test]
async fn test_outsiders_cannot_touch_vehicles() {
    let app = TestApp::new();
    let owner = app.register("Ana", "ana@garagem.app").await;
    let outsider = app.register("Zé", "ze@garagem.app").await;
    let lot = app.create_lot(&owner, "Centro").await;
    let vehicle = app.enter(&owner, &lot, "ABC1D23", "José").await;

    let entry = app
        .post(
            &format!("/api/lots/{lot}/vehicles"),
            &outsider,
            json!({ "plate": "XYZ9876", "driver": "Zé" }),
        )
        .await;
    assert_eq!(entry.status, StatusCode::FORBIDDEN);
    assert_eq!(entry.error(), "Você não tem acesso a este estacionamento");

    let exit = app
        .post(&format!("/api/vehicles/{vehicle}/exit"), &outsider, json!({}))
        .await;
    assert_eq!(exit.status, StatusCode::FORBIDDEN);

    for uri in [
        format!("/api/lots/{lot}/vehicles"),
        format!("/api/lots/{lot}/plates?prefix=AB"),
    ] {
        assert_eq!(app.get(&uri, &outsider).await.status, StatusCode::FORBIDDEN);
    }

    // Still parked: the forbidden exit changed nothing.
    let parked = app.get(&format!("/api/lots/{lot}/vehicles"), &owner).await.json();
    assert_eq!(parked.as_array().unwrap().len(), 1);
}
