use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use mockguard_core::{
    builtins, variadic, Config, Matcher, Object, RecordedInvocation, Session, TypeBuilder,
    TypeRef, Value,
};

fn account() -> TypeRef {
    TypeBuilder::new("Account")
        .extends(&builtins::object())
        .includes(&builtins::comparable())
        .method("balance", 0)
        .method("deposit", variadic(1))
        .method("owner", 0)
        .build()
}

fn session() -> Session {
    let mut session = Session::new(Config::strict());
    session
        .declare_interface(&account(), |i| {
            i.method("balance", &builtins::numeric(), vec![])?;
            i.method(
                "deposit",
                &builtins::numeric(),
                vec![
                    Matcher::not_nil(&builtins::numeric()),
                    Matcher::splat(Matcher::structural(
                        [("memo", Matcher::kind_of(&builtins::string()))],
                        false,
                    )),
                ],
            )?;
            i.method("owner", Matcher::responds_to("name"), vec![])?;
            Ok(())
        })
        .unwrap_or_else(|e| panic!("declaration failed: {e}"));
    session
}

fn calls(count: usize) -> Vec<RecordedInvocation> {
    let double = Value::Object(Object::double().posing_as(&account()));
    (0..count)
        .map(|i| {
            RecordedInvocation::new(double.clone(), "deposit")
                .with_arguments(vec![Value::Integer(i as i64)])
                .returning(vec![Value::Float(i as f64)])
        })
        .collect()
}

fn bench_verify_all(c: &mut Criterion) {
    let session = session();
    let batch = calls(1_000);

    c.bench_function("verify.batch_1000", |b| {
        b.iter(|| black_box(session.verify_all(black_box(&batch))))
    });
}

fn bench_sanity(c: &mut Criterion) {
    let session = session();

    c.bench_function("sanity.registry", |b| {
        b.iter(|| black_box(session.run_sanity_checks()))
    });
}

fn bench_fingerprint(c: &mut Criterion) {
    let session = session();

    c.bench_function("registry.fingerprint", |b| {
        b.iter(|| black_box(session.registry().fingerprint()))
    });
}

criterion_group!(benches, bench_verify_all, bench_sanity, bench_fingerprint);
criterion_main!(benches);
