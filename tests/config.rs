use flowise_gateway::app::RuntimeConfig;
use flowise_gateway::config::FlowiseConfig;

fn test_runtime(flowise: FlowiseConfig) -> RuntimeConfig {
    RuntimeConfig {
        listen: "127.0.0.1:0".to_string(),
        metrics_path: "/metrics".to_string(),
        flowise,
    }
}

#[tokio::test]
async fn state_loads_from_explicit_runtime() {
    let runtime = test_runtime(FlowiseConfig::new("http://127.0.0.1:3000/api/v1", "flow-1"));
    let state = flowise_gateway::app::load_state_with_runtime(runtime).expect("load state");
    assert_eq!(
        state.runtime.flowise.prediction_url(),
        "http://127.0.0.1:3000/api/v1/prediction/flow-1"
    );
}

// Env mutation stays inside one test so nothing else in this binary races it.
#[test]
fn runtime_reads_flowise_settings_from_env() {
    unsafe {
        std::env::remove_var("FLOWISE_API_BASE_URL");
        std::env::set_var("FLOWISE_CHATFLOW_ID", "flow-env");
    }
    let err = RuntimeConfig::from_env().unwrap_err();
    assert_eq!(err.code, "config_missing");
    assert!(err.message.contains("FLOWISE_API_BASE_URL"));

    unsafe {
        std::env::set_var("FLOWISE_API_BASE_URL", "   ");
    }
    let err = RuntimeConfig::from_env().unwrap_err();
    assert_eq!(err.code, "config_missing");

    unsafe {
        std::env::set_var("FLOWISE_API_BASE_URL", "http://flowise:3000/api/v1");
        std::env::set_var("FLOWISE_TIMEOUT_MS", "1500");
        std::env::remove_var("GATEWAY_LISTEN");
    }
    let runtime = RuntimeConfig::from_env().expect("runtime");
    assert_eq!(runtime.listen, "0.0.0.0:8080");
    assert_eq!(
        runtime.flowise.prediction_url(),
        "http://flowise:3000/api/v1/prediction/flow-env"
    );
    assert_eq!(runtime.flowise.timeout_ms, 1500);

    unsafe {
        std::env::set_var("FLOWISE_TIMEOUT_MS", "soon");
    }
    let err = RuntimeConfig::from_env().unwrap_err();
    assert_eq!(err.code, "config_invalid");
}
