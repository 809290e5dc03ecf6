//! 测试数据生成模块
//!
//! 提供各种测试图的生成函数

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use pgql_engine::core::{ScalarType, Value};
use pgql_engine::storage::{from_json_str, Graph, GraphBuilder};

/// 小型社交网络，JSON 形式
pub const SOCIAL_NETWORK_JSON: &str = r#"{
  "schema": {
    "vertices": [
      {"label": "Person", "properties": [
        {"name": "name", "type": "string"},
        {"name": "age", "type": "int"}
      ]},
      {"label": "Company", "properties": [
        {"name": "name", "type": "string"}
      ]}
    ],
    "edges": [
      {"label": "knows", "properties": [{"name": "since", "type": "int"}]},
      {"label": "worksAt", "properties": []}
    ]
  },
  "vertices": [
    {"id": 1, "label": "Person", "properties": {"name": "alice", "age": 34}},
    {"id": 2, "label": "Person", "properties": {"name": "bob", "age": 27}},
    {"id": 3, "label": "Person", "properties": {"name": "carol", "age": null}},
    {"id": 4, "label": "Person", "properties": {"name": "dave", "age": 27}},
    {"id": 5, "label": "Company", "properties": {"name": "acme"}}
  ],
  "edges": [
    {"id": 100, "label": "knows", "from": 1, "to": 2, "properties": {"since": 2010}},
    {"id": 101, "label": "knows", "from": 2, "to": 3, "properties": {"since": 2015}},
    {"id": 102, "label": "knows", "from": 3, "to": 1, "properties": {}},
    {"id": 103, "label": "knows", "from": 1, "to": 4, "properties": {"since": 2020}},
    {"id": 104, "label": "worksAt", "from": 1, "to": 5, "properties": {}},
    {"id": 105, "label": "worksAt", "from": 2, "to": 5, "properties": {}},
    {"id": 106, "label": "worksAt", "from": 4, "to": 5, "properties": {}}
  ]
}"#;

pub fn social_network() -> Arc<Graph> {
    Arc::new(from_json_str(SOCIAL_NETWORK_JSON).expect("社交网络图应该能加载"))
}

/// 随机图：`V` 顶点带 group（id % 5）、score（约四分之一缺失），
/// `E` 边带 weight；包含自环和平行边
pub fn random_graph(seed: u64, vertex_count: i64, edge_count: i64) -> Arc<Graph> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut builder = GraphBuilder::new();
    builder.add_table("V").expect("add_table should succeed");
    builder.add_table("E").expect("add_table should succeed");
    builder
        .declare_property("V", "group", ScalarType::Int)
        .expect("declare_property should succeed");
    builder
        .declare_property("V", "score", ScalarType::Double)
        .expect("declare_property should succeed");
    builder
        .declare_property("E", "weight", ScalarType::Int)
        .expect("declare_property should succeed");

    for id in 1..=vertex_count {
        let mut props = vec![("group", Value::Int(id % 5))];
        if rng.gen_range(0..4) != 0 {
            props.push(("score", Value::Double(rng.gen_range(0..100) as f64 / 4.0)));
        }
        builder.add_vertex(id, "V", props).expect("add_vertex should succeed");
    }
    for i in 0..edge_count {
        let from = rng.gen_range(1..=vertex_count);
        let to = rng.gen_range(1..=vertex_count);
        builder
            .add_edge(
                vertex_count + 1 + i,
                "E",
                from,
                to,
                vec![("weight", Value::Int(rng.gen_range(-3..10)))],
            )
            .expect("add_edge should succeed");
    }
    Arc::new(builder.build().expect("build should succeed"))
}

/// code 为 0 与 2^32 + 1 的整数哈希码相同
pub const COLLIDING_CODES: [i64; 2] = [0, (1 << 32) + 1];

/// 顶点 1..=8 的 code 在两个哈希冲突的值之间交替
pub fn collision_graph() -> Arc<Graph> {
    let mut builder = GraphBuilder::new();
    builder.add_table("V").expect("add_table should succeed");
    builder
        .declare_property("V", "code", ScalarType::Int)
        .expect("declare_property should succeed");
    for id in 1..=8i64 {
        let code = COLLIDING_CODES[(id % 2) as usize];
        builder
            .add_vertex(id, "V", vec![("code", Value::Int(code))])
            .expect("add_vertex should succeed");
    }
    Arc::new(builder.build().expect("build should succeed"))
}
