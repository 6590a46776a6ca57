//! JSON, spreadsheet and PDF reports over HTTP.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::io::Cursor;

use axum::http::StatusCode;
use calamine::{Data, Reader, Xlsx, open_workbook_from_rs};
use chrono::TimeDelta;
use garagem_integration_tests::TestApp;
use serde_json::json;

/// Lot "Centro" with one closed stay of 2h05 and one open stay, generated at
/// 14:05 local time on 10/07/2024.
async fn setup(app: &TestApp) -> (String, String) {
    let owner = app.register("Ana Souza", "ana@garagem.app").await;
    let lot = app.create_lot(&owner, "Centro").await;

    let closed = app.enter(&owner, &lot, "ABC1D23", "José Araújo").await;
    app.clock.advance(TimeDelta::minutes(65));
    app.enter(&owner, &lot, "XYZ9876", "Lia").await;
    app.clock.advance(TimeDelta::minutes(60));
    app.post(&format!("/api/vehicles/{closed}/exit"), &owner, json!({}))
        .await;

    (owner, lot)
}

#[tokio::test]
async fn test_json_report() {
    let app = TestApp::new();
    let (owner, lot) = setup(&app).await;

    let response = app
        .get(
            &format!("/api/lots/{lot}/report?start=2024-07-10&end=2024-07-10"),
            &owner,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let report = response.json();
    assert_eq!(report["lot_name"], "Centro");
    assert_eq!(report["generated_by"], "Ana Souza");
    assert_eq!(report["start"], "2024-07-10");

    let rows = report["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["plate"], "XYZ9876");
    assert_eq!(rows[0]["duration"], "1h 0min");
    assert_eq!(rows[1]["plate"], "ABC1D23");
    assert_eq!(rows[1]["duration"], "2h 5min");

    let other_day = app
        .get(
            &format!("/api/lots/{lot}/report?start=2024-07-09&end=2024-07-09"),
            &owner,
        )
        .await;
    assert_eq!(other_day.json()["rows"], json!([]));
}

#[tokio::test]
async fn test_spreadsheet_download() {
    let app = TestApp::new();
    let (owner, lot) = setup(&app).await;

    let response = app
        .get(
            &format!("/api/lots/{lot}/report?start=2024-07-01&end=2024-07-31&format=xlsx"),
            &owner,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.header("content-type").unwrap(),
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    let disposition = response.header("content-disposition").unwrap();
    assert!(disposition.starts_with("attachment;"));
    assert!(disposition.contains("relatorio-Centro-10-07-2024-14-05.xlsx"));

    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(response.body)).unwrap();
    let range = workbook.worksheet_range("Relatório").unwrap();
    let cell = |row: u32, col: u32| match range.get_value((row, col)) {
        Some(Data::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };

    assert_eq!(cell(0, 0), "RELATÓRIO DE MOVIMENTAÇÃO DE VEÍCULOS");
    assert_eq!(cell(2, 1), "Centro");
    assert_eq!(cell(3, 1), "01/07/2024 até 31/07/2024");
    assert_eq!(cell(4, 1), "Ana Souza");
    assert_eq!(cell(5, 1), "10/07/2024 às 14:05");
    assert_eq!(cell(7, 0), "PLACA");
    assert_eq!(cell(8, 0), "XYZ9876");
    assert_eq!(cell(8, 3), "-");
    assert_eq!(cell(9, 0), "ABC1D23");
    assert_eq!(cell(9, 1), "José Araújo");
    assert_eq!(cell(9, 2), "10/07/2024 12:00");
    assert_eq!(cell(9, 3), "10/07/2024 14:05");
    assert_eq!(cell(9, 4), "2h 5min");
}

#[tokio::test]
async fn test_pdf_download() {
    let app = TestApp::new();
    let (owner, lot) = setup(&app).await;

    let response = app
        .get(
            &format!("/api/lots/{lot}/report?start=2024-07-10&end=2024-07-10&format=pdf"),
            &owner,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("content-type").unwrap(), "application/pdf");
    assert!(
        response
            .header("content-disposition")
            .unwrap()
            .contains(".pdf")
    );
    assert!(response.body.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_report_rejections() {
    let app = TestApp::new();
    let (owner, lot) = setup(&app).await;
    let outsider = app.register("Zé", "ze@garagem.app").await;

    let inverted = app
        .get(
            &format!("/api/lots/{lot}/report?start=2024-07-10&end=2024-07-09"),
            &owner,
        )
        .await;
    assert_eq!(inverted.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        inverted.error(),
        "A data inicial deve ser anterior ou igual à data final"
    );

    let missing_dates = app.get(&format!("/api/lots/{lot}/report"), &owner).await;
    assert_eq!(missing_dates.status, StatusCode::BAD_REQUEST);

    let forbidden = app
        .get(
            &format!("/api/lots/{lot}/report?start=2024-07-10&end=2024-07-10"),
            &outsider,
        )
        .await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
}
