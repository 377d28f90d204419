use std::time::Duration;

use clap::Parser;
use kafka_nest::{
    build_messages, parse_duration, render_payload, BrokerOpts, ConsumeArgs, ProduceArgs,
};
use kafka_nest_engine::{
    ConnectionConfig, DebugContext, InboundMessage, OffsetStorePolicy, ScramMechanism,
};

fn broker_opts() -> BrokerOpts {
    BrokerOpts {
        brokers: "broker-1:9093,broker-2:9093".to_string(),
        username: "app".to_string(),
        password: "secret".to_string(),
        mechanism: ScramMechanism::Sha512,
        ca_location: None,
        client_id: Some("cli".to_string()),
        debug: None,
    }
}

fn inbound(payload: &[u8]) -> InboundMessage {
    InboundMessage {
        topic: "events".to_string(),
        partition: 2,
        offset: 41,
        key: None,
        payload: Some(payload.to_vec()),
        headers: Vec::new(),
        timestamp: None,
    }
}

#[test]
fn test_broker_opts_to_connection_config() {
    let config = ConnectionConfig::from(&broker_opts());

    assert_eq!(config.brokers, "broker-1:9093,broker-2:9093");
    assert_eq!(config.username, "app");
    assert_eq!(config.password, "secret");
    assert_eq!(config.mechanism, ScramMechanism::Sha512);
    assert_eq!(config.identity.as_deref(), Some("cli"));
    assert!(config.ca_location.is_none());
    assert!(config.debug.is_empty());
    assert!(config.validate().is_ok());
}

#[test]
fn test_empty_ca_location_is_ignored() {
    let mut opts = broker_opts();
    opts.ca_location = Some(std::path::PathBuf::new());
    let config = ConnectionConfig::from(&opts);

    assert!(config.ca_path().is_none());
    assert!(config.validate().is_ok());
}

#[test]
fn test_produce_args_defaults() {
    let args = ProduceArgs::try_parse_from([
        "produce",
        "--brokers",
        "localhost:9093",
        "--username",
        "app",
        "--password",
        "secret",
    ])
    .unwrap();

    assert_eq!(args.topic, "default");
    assert_eq!(args.count, 9);
    assert!(args.values.is_empty());
    assert_eq!(args.timeout, Duration::from_secs(10));
    assert_eq!(args.broker.mechanism, ScramMechanism::Sha256);
}

#[test]
fn test_unknown_mechanism_is_rejected_by_parser() {
    let result = ProduceArgs::try_parse_from([
        "produce",
        "--brokers",
        "localhost:9093",
        "--username",
        "app",
        "--password",
        "secret",
        "--mechanism",
        "PLAIN",
    ]);

    assert!(result.is_err());
}

#[test]
fn test_consume_args_topics_and_debug() {
    let args = ConsumeArgs::try_parse_from([
        "consume",
        "--brokers",
        "localhost:9093",
        "--username",
        "app",
        "--password",
        "secret",
        "--topics",
        "default,test",
        "--debug",
        "broker,security",
    ])
    .unwrap();

    assert_eq!(args.topics, vec!["default", "test"]);
    assert_eq!(args.group_id, "test-consumer-group");
    assert_eq!(args.session_timeout, Duration::from_secs(60));
    assert_eq!(args.poll_timeout, Duration::from_millis(100));
    assert_eq!(args.offset_store_policy(), OffsetStorePolicy::Always);

    let debug = args.broker.debug.unwrap();
    assert!(debug.contains(DebugContext::Broker));
    assert!(debug.contains(DebugContext::Security));
    assert!(!debug.contains(DebugContext::Conf));
}

#[test]
fn test_store_on_success_flag() {
    let args = ConsumeArgs::try_parse_from([
        "consume",
        "--brokers",
        "localhost:9093",
        "--username",
        "app",
        "--password",
        "secret",
        "--topics",
        "default",
        "--store-on-success",
    ])
    .unwrap();

    assert_eq!(args.offset_store_policy(), OffsetStorePolicy::OnSuccess);
}

#[test]
fn test_parse_duration() {
    assert_eq!(parse_duration("30").unwrap(), Duration::from_secs(30));
    assert_eq!(parse_duration("45s").unwrap(), Duration::from_secs(45));
    assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
    assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
    assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
    assert!(parse_duration("soon").is_err());
}

#[test]
fn test_parse_duration_rejects_overflow() {
    let err = parse_duration("5124095576030432h").unwrap_err();
    assert!(err.to_string().contains("out of range"));
    assert!(parse_duration("307445734561825861m").is_err());
    assert_eq!(
        parse_duration("5124095576030431h").unwrap(),
        Duration::from_secs(5_124_095_576_030_431 * 3600)
    );
}

#[test]
fn test_build_generated_messages() {
    let messages = build_messages("default", 3, &[]);

    let payloads: Vec<_> = messages
        .iter()
        .map(|m| m.payload.clone().unwrap())
        .collect();
    assert_eq!(
        payloads,
        vec![b"value0".to_vec(), b"value1".to_vec(), b"value2".to_vec()]
    );
    assert!(messages.iter().all(|m| m.topic == "default"));

    let first_key = messages[0].key.clone().unwrap();
    let second_key = messages[1].key.clone().unwrap();
    assert_eq!(first_key.len(), 36);
    assert_ne!(first_key, second_key);
}

#[test]
fn test_explicit_values_override_count() {
    let values = vec!["a".to_string(), "b".to_string()];
    let messages = build_messages("events", 9, &values);

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].payload.as_deref(), Some(&b"b"[..]));
}

#[test]
fn test_render_json_body() {
    let message = inbound(br#"{"body": "hello", "extra": 1}"#);
    assert_eq!(render_payload(&message, false).unwrap(), "hello");
}

#[test]
fn test_render_raw_payload() {
    let message = inbound(b"not json");
    assert_eq!(render_payload(&message, true).unwrap(), "not json");
}

#[test]
fn test_render_invalid_json_fails() {
    let message = inbound(b"not json");
    let err = render_payload(&message, false).unwrap_err();
    assert!(err.to_string().contains("events [2] offset 41"));
}
