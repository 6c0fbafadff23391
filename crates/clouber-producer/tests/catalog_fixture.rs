//! Tests against the demo producer catalog

use clouber_producer::{
    load_catalog, parse_catalog_line, LocalProducer, PortletMode, Producer, RegistrationData,
    UserContext, WindowState,
};
use clouber_core::ErrorCode;
use proptest::prelude::*;
use std::path::PathBuf;

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/producer.catalog")
}

#[test]
fn test_fixture_has_fifteen_portlets() {
    let portlets = load_catalog(fixture()).unwrap();
    assert_eq!(portlets.len(), 15);
    assert_eq!(portlets[0].portlet_id(), "weather");
    assert_eq!(portlets[14].portlet_id(), "poll");
}

#[test]
fn test_fixture_rows_carry_five_markup_types() {
    for info in load_catalog(fixture()).unwrap() {
        let mime_types: Vec<&str> = info
            .markup_types()
            .iter()
            .map(|m| m.mime_type.as_str())
            .collect();
        assert_eq!(
            mime_types,
            vec![
                "text/html",
                "application/xhtml+xml",
                "text/plain",
                "text/vnd.wap.wml",
                "application/json"
            ],
            "portlet {}",
            info.portlet_id()
        );
        for markup_type in info.markup_types() {
            assert_eq!(
                markup_type.window_states,
                vec![WindowState::Normal, WindowState::Minimized, WindowState::Maximized]
            );
            assert_eq!(markup_type.locales, vec!["en", "zh-CN"]);
        }
    }
}

#[test]
fn test_fixture_values_are_decoded() {
    let portlets = load_catalog(fixture()).unwrap();
    let weather = &portlets[0];
    assert_eq!(weather.display_name(), Some("Weather Now"));
    assert_eq!(
        weather.init_param("markup"),
        Some("<div class=\"weather\">{title} [{mode}] {state}</div>")
    );
    assert_eq!(
        weather.markup_types()[4].modes,
        vec![PortletMode::View, PortletMode::Custom("preview".into())]
    );
    assert_eq!(weather.keywords(), ["news".to_string(), "weather".to_string()]);

    let translate = portlets.iter().find(|p| p.portlet_id() == "translate").unwrap();
    assert_eq!(translate.display_name(), Some("翻译"));
}

#[test]
fn test_missing_file_is_a_load_error() {
    let err = load_catalog("/nonexistent/producer.catalog").unwrap_err();
    assert_eq!(err.code(), ErrorCode::ConfigLoadError);
    assert!(err.context().contains_key("path"));
}

#[tokio::test]
async fn test_service_description_lists_fixture() {
    let producer = LocalProducer::new("demo", load_catalog(fixture()).unwrap());
    let user = UserContext::anonymous();
    let context = producer
        .register(RegistrationData::new("portal", "clouber/0.2"), None, &user)
        .await
        .unwrap();

    let all = producer
        .get_service_description(&context, &[], None, &user)
        .await
        .unwrap();
    assert_eq!(all.offered_portlets.len(), 15);
    assert!(all.requires_registration);
    assert!(all.registration_context.is_none());

    let filter = vec!["poll".to_string(), "missing".to_string(), "clock".to_string()];
    let subset = producer
        .get_service_description(&context, &[], Some(&filter), &user)
        .await
        .unwrap();
    let ids: Vec<&str> = subset.offered_portlets.iter().map(|p| p.portlet_id()).collect();
    assert_eq!(ids, vec!["clock", "poll"]);
}

proptest! {
    #[test]
    fn prop_encoded_slash_survives_multi_value_split(name in "[a-z]{1,8}", other in "[a-z]{1,8}") {
        let line = format!("portletID:p&handledEvent:{name}%2F{other}/{other}");
        let info = parse_catalog_line(&line).unwrap();
        prop_assert_eq!(
            info.handled_events().to_vec(),
            vec![format!("{name}/{other}"), other.clone()]
        );
    }
}
