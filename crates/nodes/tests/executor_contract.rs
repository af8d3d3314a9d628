//! The executor against a dynamic, map-backed state record.
//!
//! A map lets a stage try things `ResearchState` makes impossible by
//! construction (clearing a field, writing any key), which is exactly what
//! the executor's contract check has to catch.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use nodes::PipelineExecutor;
use pipeline::{
    ContractViolation, GenerationError, PipelineGraph, PipelineName, ProviderFailure, Stage,
    StageError, StateRecord,
};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default, PartialEq)]
struct MapState(BTreeMap<&'static str, String>);

/// `None` clears the key.
type MapUpdate = Vec<(&'static str, Option<String>)>;

impl StateRecord for MapState {
    type Field = &'static str;
    type Update = MapUpdate;

    fn populated(&self) -> Vec<&'static str> {
        self.0.keys().copied().collect()
    }

    fn fields_written(update: &MapUpdate) -> Vec<&'static str> {
        update.iter().map(|(k, _)| *k).collect()
    }

    fn merge(&self, update: MapUpdate) -> Self {
        let mut map = self.0.clone();
        for (key, value) in update {
            match value {
                Some(v) => {
                    map.insert(key, v);
                }
                None => {
                    map.remove(key);
                }
            }
        }
        MapState(map)
    }

    fn same_value(&self, other: &Self, field: &'static str) -> bool {
        self.0.get(field) == other.0.get(field)
    }
}

struct Writer {
    name: &'static str,
    owns: Vec<&'static str>,
    writes: MapUpdate,
    fail: bool,
    log: Arc<Mutex<Vec<&'static str>>>,
}

#[async_trait]
impl Stage<MapState> for Writer {
    fn owned_fields(&self) -> &[&'static str] {
        &self.owns
    }

    async fn run(&self, _state: &MapState) -> Result<MapUpdate, StageError> {
        self.log.lock().unwrap().push(self.name);
        if self.fail {
            return Err(GenerationError::new("fake", ProviderFailure::Timeout).into());
        }
        Ok(self.writes.clone())
    }
}

struct Harness {
    graph: PipelineGraph<MapState>,
    log: Arc<Mutex<Vec<&'static str>>>,
}

impl Harness {
    fn new() -> Self {
        Self {
            graph: PipelineGraph::new(PipelineName::new("map").unwrap()),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn stage(&mut self, name: &'static str, owns: &[&'static str], writes: MapUpdate) -> &mut Self {
        self.add(name, owns, writes, false)
    }

    fn failing_stage(&mut self, name: &'static str) -> &mut Self {
        self.add(name, &[], Vec::new(), true)
    }

    fn add(
        &mut self,
        name: &'static str,
        owns: &[&'static str],
        writes: MapUpdate,
        fail: bool,
    ) -> &mut Self {
        let stage = Writer {
            name,
            owns: owns.to_vec(),
            writes,
            fail,
            log: Arc::clone(&self.log),
        };
        self.graph.register(name, stage).unwrap();
        self
    }

    fn chain(&mut self, order: &[&str]) -> &mut Self {
        for pair in order.windows(2) {
            self.graph.connect(pair[0], pair[1]).unwrap();
        }
        self.graph.set_entry(order[0]).unwrap();
        self.graph.set_terminal(order[order.len() - 1]).unwrap();
        self
    }

    async fn run(&self, initial: MapState) -> Result<MapState, pipeline::StageExecutionError> {
        PipelineExecutor::new(self.graph.compile().unwrap())
            .invoke(initial, &CancellationToken::new())
            .await
    }

    fn log(&self) -> Vec<&'static str> {
        self.log.lock().unwrap().clone()
    }
}

fn set(key: &'static str, value: &str) -> (&'static str, Option<String>) {
    (key, Some(value.to_owned()))
}

fn initial() -> MapState {
    MapState(BTreeMap::from([("query", "q".to_owned())]))
}

fn violation_of(err: &StageError) -> (String, ContractViolation) {
    match err {
        StageError::StateContractViolation { field, violation } => (field.clone(), *violation),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn follows_edges_not_registration_order() {
    let mut h = Harness::new();
    h.stage("c", &["c"], vec![set("c", "3")])
        .stage("a", &["a"], vec![set("a", "1")])
        .stage("b", &["b"], vec![set("b", "2")])
        .chain(&["a", "b", "c"]);

    let state = h.run(initial()).await.unwrap();

    assert_eq!(h.log(), vec!["a", "b", "c"]);
    assert_eq!(state.populated(), vec!["a", "b", "c", "query"]);
}

#[tokio::test]
async fn stage_may_overwrite_a_field_it_owns() {
    let mut h = Harness::new();
    h.stage("first", &["notes"], vec![set("notes", "draft")])
        .stage("second", &["notes"], vec![set("notes", "final")])
        .chain(&["first", "second"]);

    let state = h.run(initial()).await.unwrap();
    assert_eq!(state.0["notes"], "final");
}

#[tokio::test]
async fn writing_an_unowned_field_is_rejected() {
    let mut h = Harness::new();
    h.stage("a", &["a"], vec![set("a", "1"), set("query", "hijacked")])
        .stage("b", &["b"], vec![set("b", "2")])
        .chain(&["a", "b"]);

    let err = h.run(initial()).await.unwrap_err();

    assert_eq!(err.stage.as_str(), "a");
    assert_eq!(
        violation_of(&err.cause),
        ("query".to_owned(), ContractViolation::WroteUnownedField)
    );
    assert_eq!(h.log(), vec!["a"]);
}

#[tokio::test]
async fn clearing_a_populated_field_is_rejected_even_when_owned() {
    let mut h = Harness::new();
    h.stage("writer", &["notes"], vec![set("notes", "n")])
        .stage("clearer", &["notes"], vec![("notes", None)])
        .chain(&["writer", "clearer"]);

    let err = h.run(initial()).await.unwrap_err();

    assert_eq!(err.stage.as_str(), "clearer");
    assert_eq!(
        violation_of(&err.cause),
        ("notes".to_owned(), ContractViolation::DroppedField)
    );
}

#[tokio::test]
async fn failure_stops_later_stages() {
    let mut h = Harness::new();
    h.stage("a", &["a"], vec![set("a", "1")])
        .failing_stage("b")
        .stage("c", &["c"], vec![set("c", "3")])
        .chain(&["a", "b", "c"]);

    let err = h.run(initial()).await.unwrap_err();

    assert_eq!(err.stage.as_str(), "b");
    assert!(matches!(err.cause, StageError::Generation(_)));
    assert_eq!(h.log(), vec!["a", "b"]);
}

#[tokio::test]
async fn every_prior_field_survives_each_stage() {
    let mut h = Harness::new();
    h.stage("a", &["a"], vec![set("a", "1")])
        .stage("b", &["b"], vec![set("b", "2")])
        .chain(&["a", "b"]);

    let before = initial();
    let after = h.run(before.clone()).await.unwrap();
    for field in before.populated() {
        assert!(before.same_value(&after, field), "{field} changed");
    }
}
