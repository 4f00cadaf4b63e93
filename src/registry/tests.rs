use super::*;

#[test]
fn test_agent_class_serialization() {
    let class = AgentClass::Supervisory;
    let json = serde_json::to_string(&class).unwrap();
    assert_eq!(json, r#""supervisory""#);

    let parsed: AgentClass = serde_json::from_str(r#""cli""#).unwrap();
    assert_eq!(parsed, AgentClass::Cli);
}

#[test]
fn test_agent_class_from_str() {
    assert_eq!("hosted".parse::<AgentClass>().unwrap(), AgentClass::Hosted);
    assert_eq!(" CLI ".parse::<AgentClass>().unwrap(), AgentClass::Cli);
    assert!("remote".parse::<AgentClass>().is_err());
}

#[test]
fn test_has_capabilities_is_case_insensitive() {
    let agent = AgentDescriptor::new("a", AgentClass::Cli).with_capabilities(["Code", "review"]);
    assert!(agent.has_capabilities(&["code".to_string()]));
    assert!(agent.has_capabilities(&["REVIEW".to_string(), "code".to_string()]));
    assert!(!agent.has_capabilities(&["vision".to_string()]));
    assert!(agent.has_capabilities(&[]));
}

#[test]
fn test_register_overwrites_existing() {
    let registry = Registry::new();
    assert!(registry
        .register(AgentDescriptor::new("a", AgentClass::Cli))
        .is_none());

    let replaced = registry.register(AgentDescriptor::new("a", AgentClass::Hosted));
    assert_eq!(replaced.map(|d| d.class), Some(AgentClass::Cli));
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.get("a").unwrap().class, AgentClass::Hosted);
}

#[test]
fn test_deregister_missing_agent() {
    let registry = Registry::new();
    let result = registry.deregister("ghost");
    assert!(matches!(result, Err(RegistryError::AgentNotFound(id)) if id == "ghost"));
}

#[test]
fn test_all_is_sorted_by_id() {
    let registry = Registry::new();
    registry.register(AgentDescriptor::new("charlie", AgentClass::Cli));
    registry.register(AgentDescriptor::new("alpha", AgentClass::Hosted));
    registry.register(AgentDescriptor::new("bravo", AgentClass::Cli));

    let ids: Vec<_> = registry.all().into_iter().map(|a| a.id).collect();
    assert_eq!(ids, vec!["alpha", "bravo", "charlie"]);

    let cli: Vec<_> = registry
        .by_class(AgentClass::Cli)
        .into_iter()
        .map(|a| a.id)
        .collect();
    assert_eq!(cli, vec!["bravo", "charlie"]);
}

#[test]
fn test_set_active_and_update_performance() {
    let registry = Registry::new();
    registry.register(AgentDescriptor::new("a", AgentClass::Cli));

    registry.set_active("a", false).unwrap();
    assert!(!registry.get("a").unwrap().active);

    let perf = AgentPerformance {
        avg_response_time_ms: 120.0,
        error_rate: 0.1,
        tasks_completed: 9,
    };
    registry.update_performance("a", perf).unwrap();
    assert_eq!(registry.get("a").unwrap().performance, perf);

    assert!(registry.update_performance("missing", perf).is_err());
    assert!(registry.set_active("missing", true).is_err());
}

#[test]
fn test_concurrent_registration() {
    use std::sync::Arc;

    let registry = Arc::new(Registry::new());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                for j in 0..25 {
                    registry.register(AgentDescriptor::new(
                        format!("agent-{}-{}", i, j),
                        AgentClass::Hosted,
                    ));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(registry.len(), 200);
}
