use exprkit::{
    BasicKeyResolver, BasicPipeResolver, Engine, EngineConfig, Error, EvalPath, ExprContext, Key,
    SyntaxError, Value,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[ctor::ctor]
fn init_tests() {
    // テストの前に一度だけ実行したい処理
    // tracing_subscriberの初期化
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

fn upper(value: Value, _: &[Value], _: &ExprContext) -> Value {
    Value::from(value.to_text().to_uppercase())
}

fn truncate(value: Value, args: &[Value], _: &ExprContext) -> Value {
    let len = args
        .first()
        .and_then(Value::as_f64)
        .map(|len| len as usize)
        .unwrap_or(usize::MAX);
    Value::from(value.to_text().chars().take(len).collect::<String>())
}

fn user_context() -> ExprContext {
    ExprContext::from_json(json!({
        "user": {"name": "alice", "roles": [{"id": "admin"}, {"id": "dev"}]},
        "age": 18
    }))
}

#[test]
fn test_cached_eval_matches_uncached_parse() {
    let engine = Engine::new();
    engine.pipes(
        BasicPipeResolver::new()
            .pipe("upper", upper)
            .pipe("truncate", truncate),
    );
    let ctx = user_context();

    let sources = [
        "plain text",
        "42",
        "${age}",
        "Hi ${user.name}!",
        "${user.roles[1].id | upper}",
        "${user.name | truncate:3 | upper}",
        "$5 and ${missing}",
    ];
    for source in sources {
        let uncached = engine.parse(source).unwrap().call(&ctx).unwrap();
        let first = engine.eval(source, &ctx).unwrap();
        let second = engine.eval(source, &ctx).unwrap();
        assert_eq!(first, uncached, "source: {}", source);
        assert_eq!(second, uncached, "source: {}", source);
    }
    assert_eq!(engine.cache_len(), sources.len());

    assert_eq!(
        engine.eval("${user.name | truncate:3 | upper}", &ctx).unwrap(),
        Value::from("ALI")
    );
    assert_eq!(
        engine.eval("$5 and ${missing}", &ctx).unwrap(),
        Value::from("$5 and ")
    );
}

#[test]
fn test_registration_invalidates_compiled_bindings() {
    let engine = Engine::new();
    let ctx = ExprContext::new();

    assert_eq!(engine.eval("${env:USER}", &ctx).unwrap(), Value::Null);

    engine.keys(BasicKeyResolver::new().key(
        Key::new("env", "*"),
        |key: &Key, _: &ExprContext| Value::from(format!("<{}>", key.name)),
    ));
    assert_eq!(engine.cache_len(), 0);
    assert_eq!(
        engine.eval("${env:USER}", &ctx).unwrap(),
        Value::from("<USER>")
    );
}

#[test]
fn test_unknown_pipe_is_syntax_error() {
    let engine = Engine::new();
    let err = engine.eval("${name | shout}", &ExprContext::new()).unwrap_err();
    assert!(matches!(
        err,
        Error::Syntax(SyntaxError::UnknownPipe(ref name)) if name == "shout"
    ));

    engine.pipes(BasicPipeResolver::new().pipe("shout", upper));
    let ctx = ExprContext::new().with_value("name", "bob");
    assert_eq!(
        engine.eval("${name | shout}", &ctx).unwrap(),
        Value::from("BOB")
    );
}

#[test]
fn test_cache_growth_is_bounded() {
    let engine = Engine::new();
    let ctx = ExprContext::new();
    for i in 0..1001 {
        engine.eval(&format!("item-{}", i), &ctx).unwrap();
        assert!(engine.cache_len() <= 1000);
    }
    // The 1001st miss found 1000 resident entries and reset the cache.
    assert_eq!(engine.cache_len(), 1);
}

#[test]
fn test_configured_threshold() {
    let config = EngineConfig::from_json(r#"{"expr_cache_threshold": 2}"#).unwrap();
    let engine = Engine::with_config(config).unwrap();
    let ctx = ExprContext::new();
    engine.eval("a", &ctx).unwrap();
    engine.eval("b", &ctx).unwrap();
    assert_eq!(engine.cache_len(), 2);
    engine.eval("c", &ctx).unwrap();
    assert_eq!(engine.cache_len(), 1);
}

#[test]
fn test_registered_key_reflected_on_next_eval() {
    let engine = Engine::new();
    let ctx = ExprContext::new();
    assert_eq!(engine.eval("${x}", &ctx).unwrap(), Value::Null);

    engine.keys(
        BasicKeyResolver::new().key(Key::parse("x"), |_: &Key, _: &ExprContext| {
            Value::Integer(1)
        }),
    );
    assert_eq!(engine.eval("${x}", &ctx).unwrap(), Value::Integer(1));
    assert_eq!(
        engine.eval("x=${x}", &ctx.scoped("x", 9)).unwrap(),
        Value::from("x=1")
    );
}

#[test]
fn test_float_interpolation_keeps_fraction() {
    let engine = Engine::new();
    let ctx = ExprContext::new().with_value("ratio", 1.0);
    assert_eq!(engine.eval("${ratio}", &ctx).unwrap(), Value::Float(1.0));
    assert_eq!(
        engine.eval("ratio ${ratio}", &ctx).unwrap(),
        Value::from("ratio 1.0")
    );
}

#[test]
fn test_context_override_wins_over_engine_chain() {
    let engine = Engine::new();
    engine.keys(
        BasicKeyResolver::new().key(Key::parse("x"), |_: &Key, _: &ExprContext| {
            Value::Integer(1)
        }),
    );

    let plain = ExprContext::new();
    assert_eq!(engine.eval("${x}", &plain).unwrap(), Value::Integer(1));

    let overridden = ExprContext::new().with_keys(BasicKeyResolver::new().key(
        Key::parse("x"),
        |_: &Key, _: &ExprContext| Value::Integer(5),
    ));
    assert_eq!(engine.eval("${x}", &overridden).unwrap(), Value::Integer(5));
    assert_eq!(
        engine.eval("${x}", &overridden.scoped("x", 3)).unwrap(),
        Value::Integer(5)
    );
    assert_eq!(engine.resolve_key("x", &overridden), Value::Integer(5));

    // Keys the override does not know fall through to the engine chain.
    assert_eq!(engine.eval("${x}", &plain).unwrap(), Value::Integer(1));
    assert_eq!(engine.eval("${y}", &overridden).unwrap(), Value::Null);
}

#[test]
fn test_override_inherited_by_scoped_context() {
    let engine = Engine::new();
    let ctx = ExprContext::new().with_keys(BasicKeyResolver::new().key(
        Key::new("var", "greeting"),
        |_: &Key, _: &ExprContext| Value::from("hey"),
    ));
    let scoped = ctx.scoped("repeat", json!({"item": "bob"}));
    assert_eq!(
        engine
            .eval("${var:greeting} ${repeat:item}", &scoped)
            .unwrap(),
        Value::from("hey bob")
    );
}

#[test]
fn test_path_lookups() {
    let engine = Engine::new();
    let root = Value::from(json!({"items": [{"name": "a"}, {"name": "b"}]}));

    assert_eq!(
        engine.get_path("items[1].name", &root).unwrap(),
        Value::from("b")
    );
    assert_eq!(engine.get_path("items.0.name", &root).unwrap(), Value::from("a"));
    assert_eq!(engine.get_path("items[5].name", &root).unwrap(), Value::Null);
    assert_eq!(engine.get_path("", &root).unwrap(), root);
    assert!(matches!(
        engine.get_path("items[x]", &root),
        Err(Error::Syntax(SyntaxError::InvalidPath(_)))
    ));
}

#[test]
fn test_global_engine_and_eval_path() {
    let value = Value::from(json!({"a": {"b": true}}));
    assert_eq!(value.eval_path("a.b").unwrap(), Value::Boolean(true));
    assert!(Engine::global().path_cache_len() >= 1);
    assert_eq!(
        Engine::global()
            .eval("${a.b}", &ExprContext::from_json(json!({"a": {"b": 1}})))
            .unwrap(),
        Value::Integer(1)
    );
}
