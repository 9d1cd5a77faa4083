use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};

use invsearch::bucket::ring_offsets;
use invsearch::item::{Enchantment, ItemMeta, ItemStack, Material};
use invsearch::matcher::{ItemPredicate, Matcher, MetaPredicate};
use invsearch::token::Token;

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("token parse", |b| {
        b.iter(|| Token::parse(black_box("chunk{w:world,x:-120,z:48,r:10,l:true}")))
    });
    c.bench_function("token display", |b| {
        let token = Token::parse("enchant{t:sharpness,l:3}").unwrap();
        b.iter(|| black_box(&token).to_string())
    });

    c.bench_function("ring 0", |b| b.iter(|| ring_offsets(black_box(0))));
    c.bench_function("ring 10", |b| b.iter(|| ring_offsets(black_box(10))));
    c.bench_function("ring 100", |b| b.iter(|| ring_offsets(black_box(100))));

    // a full chest of swords, a third of them carrying the wanted enchantment
    let sword = Material::new("diamond_sword");
    let sharpness = Enchantment::new("sharpness");
    let contents: Vec<Option<ItemStack>> = (0..27)
        .map(|slot| match slot % 3 {
            0 => Some(ItemStack::new(sword.clone(), 1).with_meta(ItemMeta::new().with_enchant(sharpness.clone(), 5))),
            1 => Some(ItemStack::new(sword.clone(), 1)),
            _ => None,
        })
        .collect();
    let type_only = Matcher::new(vec![ItemPredicate::is_type(Material::new("stone"))], vec![]);
    let enchanted = Matcher::new(
        vec![ItemPredicate::is_type(sword.clone())],
        vec![MetaPredicate::has_enchant(Some(sharpness.clone()), Some(6))],
    );
    c.bench_function("match chest miss", |b| b.iter(|| type_only.matches_any(black_box(&contents))));
    c.bench_function("match chest enchant miss", |b| b.iter(|| enchanted.matches_any(black_box(&contents))));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
