mod common;

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use customer_order_etl::InputError;
use customer_order_etl::ingestion::NullObserver;
use customer_order_etl::loader::{Loader, SqliteStore};
use customer_order_etl::normalize::{OrderNormalizer, SkipReason};
use customer_order_etl::types::Value;

use common::{RecordingObserver, SCHEMA_SQL, fixture};

fn order_xml(order_id: &str, sku_count: &str, total_amount: Option<&str>) -> String {
    let amount = total_amount
        .map(|a| format!("<total_amount>{a}</total_amount>"))
        .unwrap_or_default();
    format!(
        "<orders><order>\
           <order_id>{order_id}</order_id>\
           <mobile_number>9876543210</mobile_number>\
           <order_date_time>2024-01-15T10:30:00</order_date_time>\
           <sku_id>SKU1</sku_id>\
           <sku_count>{sku_count}</sku_count>\
           {amount}\
         </order></orders>"
    )
}

#[test]
fn round_trip_example_is_accepted() {
    let out = OrderNormalizer::default()
        .normalize_str(&order_xml("ORD-2024-1", "2", Some("500.0")))
        .unwrap();
    assert_eq!(out.len(), 1);

    let r = &out.records()[0];
    assert_eq!(r.order_id, "ORD-2024-1");
    assert_eq!(r.mobile_number, "9876543210");
    assert_eq!(r.order_datetime, Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap());
    assert_eq!(r.sku_id, "SKU1");
    assert_eq!(r.sku_count, 2);
    assert_eq!(r.total_amount, 500.0);

    let ds = out.to_data_set();
    assert_eq!(ds.rows[0][2], Value::Utf8("2024-01-15 10:30:00".to_string()));
}

#[test]
fn wrong_prefix_is_rejected() {
    let obs = Arc::new(RecordingObserver::default());
    let out = OrderNormalizer::new(obs.clone())
        .normalize_str(&order_xml("ORDER-2024-1", "2", Some("500.0")))
        .unwrap();
    assert!(out.is_empty());
    assert_eq!(obs.skip_codes(), vec!["invalid_order_id"]);
}

#[test]
fn zero_sku_count_is_rejected() {
    let out = OrderNormalizer::default()
        .normalize_str(&order_xml("ORD-2024-1", "0", Some("500.0")))
        .unwrap();
    assert!(out.is_empty());
}

#[test]
fn non_positive_amount_is_rejected() {
    for amount in ["0", "0.0", "-1.5"] {
        let out = OrderNormalizer::default()
            .normalize_str(&order_xml("ORD-2024-1", "2", Some(amount)))
            .unwrap();
        assert!(out.is_empty(), "{amount} should be rejected");
    }
}

#[test]
fn missing_total_amount_is_rejected_with_cause() {
    let obs = Arc::new(RecordingObserver::default());
    let out = OrderNormalizer::new(obs.clone())
        .normalize_str(&order_xml("ORD-2024-1", "2", None))
        .unwrap();
    assert!(out.is_empty());

    let skips = obs.skips.lock().unwrap();
    assert_eq!(skips.len(), 1);
    let (_, skip) = &skips[0];
    assert_eq!(skip.position, 1);
    assert_eq!(skip.record_id.as_deref(), Some("ORD-2024-1"));
    assert_eq!(skip.reason, SkipReason::MissingField { field: "total_amount" });
}

#[test]
fn non_numeric_sku_count_is_skipped_not_fatal() {
    let xml = format!(
        "<orders>{}{}</orders>",
        order_xml("ORD-2024-1", "two", Some("1"))
            .trim_start_matches("<orders>")
            .trim_end_matches("</orders>"),
        order_xml("ORD-2024-2", "2", Some("1"))
            .trim_start_matches("<orders>")
            .trim_end_matches("</orders>"),
    );
    let out = OrderNormalizer::default().normalize_str(&xml).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out.records()[0].order_id, "ORD-2024-2");
}

#[test]
fn normalize_fixture_file() {
    let obs = Arc::new(RecordingObserver::default());
    let out = OrderNormalizer::new(obs.clone())
        .normalize_path(fixture("orders.xml"))
        .unwrap();

    let ids: Vec<&str> = out.iter().map(|r| r.order_id.as_str()).collect();
    assert_eq!(ids, vec!["ORD-2024-1", "ORD-2024-5"]);
    assert_eq!(out.records()[1].sku_id, "SKU5");
    assert_eq!(out.records()[1].sku_count, 4);

    assert_eq!(
        obs.skip_codes(),
        vec![
            "invalid_order_id",
            "non_positive_sku_count",
            "missing_field",
            "unparseable",
            "non_positive_amount",
        ]
    );
    assert_eq!(obs.skip_positions(), vec![2, 3, 4, 6, 7]);

    // Rule rejections = input - accepted - unreadable.
    let stats = obs.last_stats().unwrap();
    let unreadable = obs
        .skips
        .lock()
        .unwrap()
        .iter()
        .filter(|(_, s)| s.reason.is_parse_failure())
        .count();
    let rule_rejections = obs.skips.lock().unwrap().len() - unreadable;
    assert_eq!(stats.input, 7);
    assert_eq!(stats.accepted, 2);
    assert_eq!(rule_rejections, stats.input - stats.accepted - unreadable);
}

#[test]
fn output_has_six_columns_in_storage_order() {
    let out = OrderNormalizer::default()
        .normalize_path(fixture("orders.xml"))
        .unwrap();
    let ds = out.to_data_set();
    let names: Vec<&str> = ds.schema.field_names().collect();
    assert_eq!(
        names,
        vec!["orderid", "mobilenumber", "orderdatetime", "skuid", "skucount", "totalamount"]
    );
    assert!(ds.rows.iter().all(|r| r.len() == 6));
}

#[test]
fn malformed_document_is_an_input_error() {
    let err = OrderNormalizer::default()
        .normalize_path(fixture("malformed_orders.xml"))
        .unwrap_err();
    assert!(matches!(err, InputError::Malformed { .. } | InputError::Xml { .. }));
}

#[test]
fn non_xml_is_an_input_error() {
    assert!(OrderNormalizer::default().normalize_str("order_id,sku\n1,2\n").is_err());
}

#[test]
fn empty_root_yields_empty_dataset() {
    let obs = Arc::new(RecordingObserver::default());
    let out = OrderNormalizer::new(obs.clone()).normalize_str("<orders/>").unwrap();
    assert!(out.is_empty());
    assert_eq!(obs.last_stats().unwrap().input, 0);
}

#[test]
fn normalize_reader_matches_normalize_str() {
    let xml = order_xml("ORD-2024-1", "2", Some("500.0"));
    let a = OrderNormalizer::default().normalize_str(&xml).unwrap();
    let b = OrderNormalizer::default().normalize_reader(xml.as_bytes()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn out_of_layout_datetimes_skip_only_their_own_node() {
    let order = |id: &str, datetime: &str| {
        format!(
            "<order>\
               <order_id>{id}</order_id>\
               <mobile_number>9876543210</mobile_number>\
               <order_date_time>{datetime}</order_date_time>\
               <sku_id>SKU1</sku_id>\
               <sku_count>1</sku_count>\
               <total_amount>10.0</total_amount>\
             </order>"
        )
    };
    let xml = format!(
        "<orders>{}{}{}</orders>",
        order("ORD-2024-1", "2024-01-15T23:59:60"),
        order("ORD-2024-2", "+2024-01-15T10:30:00"),
        order("ORD-2024-3", "2024-01-15T10:30:00"),
    );

    let obs = Arc::new(RecordingObserver::default());
    let out = OrderNormalizer::new(obs.clone()).normalize_str(&xml).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out.records()[0].order_id, "ORD-2024-3");
    assert_eq!(obs.skip_codes(), vec!["unparseable", "unparseable"]);

    // The surviving row loads; nothing malformed reaches the store.
    let mut store = SqliteStore::open_in_memory().unwrap();
    store.connection().execute_batch(SCHEMA_SQL).unwrap();
    let loaded = Loader::new(&mut store, Arc::new(NullObserver))
        .load_orders(&out)
        .unwrap();
    assert_eq!(loaded, 1);
}
