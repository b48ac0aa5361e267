//! Benchmarks for channel naming and access control

use std::sync::Arc;

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use quill_channel::{AccessPolicy, ChannelName};
use quill_core::{ArticleId, ArticleRecord, Principal, UserId, UserRecord};
use quill_store::MemoryStore;

fn bench_channel_parse(c: &mut Criterion) {
    c.bench_function("channel_parse", |b| {
        b.iter(|| ChannelName::parse(black_box("article-123456-comments")))
    });
}

fn bench_channel_format(c: &mut Criterion) {
    let channel = ChannelName::article_editing(ArticleId::new(123456));
    c.bench_function("channel_format", |b| b.iter(|| black_box(&channel).to_string()));
}

fn bench_permission_check(c: &mut Criterion) {
    let store = Arc::new(MemoryStore::new());
    let author = UserRecord::new(UserId::new(1), "ada");
    store.insert_user(author.clone());
    store.insert_article(ArticleRecord::new(ArticleId::new(42), author, Utc::now()));
    let policy = AccessPolicy::new(store);
    let member = Principal::member(UserId::new(1));

    c.bench_function("permission_anonymous", |b| {
        b.iter(|| policy.has_permission(&Principal::Anonymous, black_box("category-9")))
    });
    c.bench_function("permission_editing", |b| {
        b.iter(|| policy.has_permission(&member, black_box("article-42-editing")))
    });
}

criterion_group!(
    benches,
    bench_channel_parse,
    bench_channel_format,
    bench_permission_check
);
criterion_main!(benches);
