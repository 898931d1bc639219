//! 条件评估器性能基准测试
//!
//! 针对 ConditionEvaluator 的各种操作符以及完整规则文档评估进行性能测试。

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rule_engine::{
    ConditionEvaluator, Operator, OperatorKind, OperatorRegistry, RuleEngine, RuleSet,
};
use serde_json::{Value, json};
use std::hint::black_box;

const RULES: &str = r#"
{
    "conditions": [
        {
            "all": [
                {"field": "country", "operator": "equals", "value": "Turkey"},
                {"field": "population", "operator": "greaterThanInclusive", "value": 1000000}
            ],
            "any": [
                {"field": "city", "operator": "in", "value": ["Istanbul", "Ankara"]},
                {"field": "district", "operator": "regex", "value": "^Kad"}
            ]
        }
    ]
}
"#;

const RECORD: &str = r#"{"country": "Turkey", "city": "Istanbul", "district": "Kadikoy", "population": 2000000.0}"#;

/// 每个内置操作符的评估基准
fn bench_operators(c: &mut Criterion) {
    let mut group = c.benchmark_group("operators");

    let cases: Vec<(OperatorKind, Value, Value)> = vec![
        (OperatorKind::Equals, json!(1000), json!(1000.0)),
        (OperatorKind::NotEquals, json!("Turkey"), json!("England")),
        (OperatorKind::GreaterThan, json!(1000), json!(500)),
        (OperatorKind::LessThanInclusive, json!(2.5), json!(2.5)),
        (OperatorKind::In, json!("Turkey"), json!(["England", "Turkey"])),
        (OperatorKind::NotIn, json!("Korea"), json!(["England", "Turkey"])),
        (OperatorKind::Contains, json!("hello world"), json!("world")),
        (OperatorKind::StartsWith, json!("Istanbul"), json!("Ist")),
        (OperatorKind::EndsWith, json!("Istanbul"), json!("bul")),
    ];

    for (operator, field, expected) in &cases {
        group.bench_function(operator.as_str(), |b| {
            b.iter(|| {
                ConditionEvaluator::evaluate(
                    black_box(field),
                    black_box(*operator),
                    black_box(expected),
                )
            })
        });
    }

    group.finish();
}

/// 正则：每次编译与缓存复用对比
fn bench_regex(c: &mut Criterion) {
    let mut group = c.benchmark_group("regex");

    let field = json!("user@example.com");
    let pattern = json!(r"^[\w.+-]+@[\w-]+\.[a-z]{2,}$");

    group.bench_function("compile_each_time", |b| {
        b.iter(|| {
            ConditionEvaluator::evaluate(
                black_box(&field),
                black_box(OperatorKind::Regex),
                black_box(&pattern),
            )
        })
    });

    let registry = OperatorRegistry::builtin();
    let cached = registry.get("regex").expect("regex 操作符已注册");
    group.bench_function("cached", |b| {
        b.iter(|| cached.apply(black_box(&field), black_box(&pattern)))
    });

    group.finish();
}

/// in 操作符随列表长度的变化
fn bench_in_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("in_scaling");

    for size in [10, 100, 1000] {
        let list: Vec<Value> = (0..size).map(|i| json!(format!("item_{}", i))).collect();
        let list = Value::Array(list);
        let field = json!(format!("item_{}", size - 1));

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                ConditionEvaluator::evaluate(
                    black_box(&field),
                    black_box(OperatorKind::In),
                    black_box(&list),
                )
            })
        });
    }

    group.finish();
}

/// 完整规则文档评估
fn bench_rule_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("rule_set");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("构建运行时失败");
    let engine = RuleEngine::new();
    let rule_set = RuleSet::from_json(RULES).expect("规则文档解析失败");

    group.bench_function("execute_raw", |b| {
        b.iter(|| runtime.block_on(engine.execute(black_box(RECORD), black_box(RULES), None)))
    });

    group.bench_function("execute_parsed_rule_set", |b| {
        b.iter(|| {
            runtime.block_on(engine.execute_rule_set(black_box(RECORD), black_box(&rule_set), None))
        })
    });

    group.bench_function("execute_blocking", |b| {
        b.iter(|| rule_engine::execute(black_box(RECORD), black_box(RULES), None))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_operators,
    bench_regex,
    bench_in_scaling,
    bench_rule_set,
);

criterion_main!(benches);
