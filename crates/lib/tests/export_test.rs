//! # Export Tests
//!
//! Reads rendered workbooks back with `calamine` and checks they reproduce the
//! accumulated rows, header first, in order.

use stockmeta::{export::validate_sheet_name, ExportDocument, ExportError, ExportFormat, ResultRow};
use stockmeta_test_utils::{forty_nine_keywords, read_xlsx_rows, xlsx_sheet_names};

fn sample_document() -> ExportDocument {
    ExportDocument::new(
        "AdobeStock",
        vec![
            ResultRow {
                filename: "a.jpg".to_string(),
                title: "Red Apple On Table".to_string(),
                description: "A fresh red apple on a wooden table.".to_string(),
                keywords: forty_nine_keywords(),
            },
            ResultRow {
                filename: "b, \"quoted\".jpg".to_string(),
                title: "Green Pear In Basket".to_string(),
                description: "A ripe pear, ready to eat.".to_string(),
                keywords: "pear,fruit,basket".to_string(),
            },
        ],
    )
}

#[test]
fn test_xlsx_round_trip_reproduces_rows() -> anyhow::Result<()> {
    let doc = sample_document();
    let bytes = doc.to_xlsx()?;

    assert_eq!(xlsx_sheet_names(&bytes)?, vec!["AdobeStock".to_string()]);
    let rows = read_xlsx_rows(&bytes, "AdobeStock")?;
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0], vec!["Filename", "Title", "Description", "Keywords"]);

    let read_back: Vec<ResultRow> = rows[1..]
        .iter()
        .map(|r| ResultRow {
            filename: r[0].clone(),
            title: r[1].clone(),
            description: r[2].clone(),
            keywords: r[3].clone(),
        })
        .collect();
    assert_eq!(read_back, doc.rows);
    Ok(())
}

#[test]
fn test_xlsx_uses_configured_sheet_name() -> anyhow::Result<()> {
    let mut doc = sample_document();
    doc.sheet_name = "Shutterstock".to_string();
    let bytes = doc.render(ExportFormat::Xlsx)?;
    assert_eq!(xlsx_sheet_names(&bytes)?, vec!["Shutterstock".to_string()]);
    Ok(())
}

#[test]
fn test_xlsx_rejects_invalid_sheet_name() {
    let mut doc = sample_document();
    doc.sheet_name = "bad/name".to_string();
    assert!(matches!(doc.to_xlsx(), Err(ExportError::Xlsx(_))));
}

#[test]
fn test_csv_has_header_and_quoted_rows() -> anyhow::Result<()> {
    let doc = sample_document();
    let bytes = doc.render(ExportFormat::Csv)?;

    let mut reader = csv::Reader::from_reader(bytes.as_slice());
    let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
    assert_eq!(headers, vec!["Filename", "Title", "Description", "Keywords"]);

    let rows: Vec<ResultRow> = reader.deserialize().collect::<Result<_, _>>()?;
    assert_eq!(rows, doc.rows);
    Ok(())
}

#[test]
fn test_empty_document_still_has_header() -> anyhow::Result<()> {
    let doc = ExportDocument::new("AdobeStock", vec![]);
    let csv = String::from_utf8(doc.to_csv()?)?;
    assert_eq!(csv.trim_end(), "Filename,Title,Description,Keywords");

    let rows = read_xlsx_rows(&doc.to_xlsx()?, "AdobeStock")?;
    assert_eq!(rows.len(), 1);
    Ok(())
}

#[test]
fn test_export_format_parsing() {
    assert_eq!("xlsx".parse::<ExportFormat>().unwrap(), ExportFormat::Xlsx);
    assert_eq!(" CSV ".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
    assert!("pdf".parse::<ExportFormat>().is_err());
    assert_eq!(ExportFormat::default(), ExportFormat::Xlsx);
    assert_eq!(ExportFormat::Csv.extension(), "csv");
    assert_eq!(
        ExportFormat::Xlsx.content_type(),
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
}

#[test]
fn test_export_format_deserializes_case_insensitively() {
    let csv: ExportFormat = serde_json::from_str("\"CSV\"").unwrap();
    assert_eq!(csv, ExportFormat::Csv);
    let xlsx: ExportFormat = serde_json::from_str("\"xlsx\"").unwrap();
    assert_eq!(xlsx, ExportFormat::Xlsx);
    assert!(serde_json::from_str::<ExportFormat>("\"pdf\"").is_err());
    assert_eq!(serde_json::to_string(&ExportFormat::Csv).unwrap(), "\"csv\"");
}

#[test]
fn test_sheet_name_rules() {
    assert!(validate_sheet_name("AdobeStock").is_ok());
    assert!(validate_sheet_name(&"x".repeat(31)).is_ok());
    let too_long = "x".repeat(32);
    for bad in ["", "bad/name", "what?", "[draft]", too_long.as_str()] {
        assert!(
            matches!(validate_sheet_name(bad), Err(ExportError::Xlsx(_))),
            "accepted {bad:?}"
        );
    }
}
