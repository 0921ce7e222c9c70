//! In-memory NodeClaimClient for tests
//!
//! Each test owns its own fake. Status transitions are scripted per claim:
//! successive `get` calls walk the script and the last entry sticks.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use kube::core::ErrorResponse;
use kube::ResourceExt;

use nodeclaim_common::crd::{Condition, ConditionStatus, NodeClaim, NodeClaimSpec, NodeClaimStatus};

use crate::client::{ClaimKey, NodeClaimClient};

/// One observation returned by `get`
#[derive(Clone, Debug)]
pub enum Snapshot {
    Conditions(Vec<Condition>),
    Error { code: u16, message: String },
}

impl Snapshot {
    pub fn pending() -> Self {
        Self::Conditions(vec![])
    }

    pub fn ready() -> Self {
        Self::Conditions(vec![
            Condition::new("Launched", ConditionStatus::True, "", ""),
            Condition::new("Ready", ConditionStatus::True, "", ""),
        ])
    }

    pub fn launch_failed(message: &str) -> Self {
        Self::Conditions(vec![Condition::new(
            "Launched",
            ConditionStatus::False,
            "LaunchFailed",
            message,
        )])
    }

    pub fn error(code: u16, message: &str) -> Self {
        Self::Error {
            code,
            message: message.to_string(),
        }
    }
}

pub fn api_error(code: u16, reason: &str, message: &str) -> kube::Error {
    kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: message.to_string(),
        reason: reason.to_string(),
        code,
    })
}

fn reason_for(code: u16) -> &'static str {
    match code {
        404 => "NotFound",
        409 => "AlreadyExists",
        403 => "Forbidden",
        429 => "TooManyRequests",
        c if c >= 500 => "InternalError",
        _ => "BadRequest",
    }
}

#[derive(Default)]
struct State {
    objects: BTreeMap<ClaimKey, NodeClaim>,
    scripts: BTreeMap<ClaimKey, VecDeque<Snapshot>>,
    hanging: BTreeSet<ClaimKey>,
    create_failure: Option<(u16, String)>,
    list_failure: Option<(u16, String)>,
    created: Vec<ClaimKey>,
    get_calls: BTreeMap<ClaimKey, usize>,
}

#[derive(Default)]
pub struct FakeNodeClaimClient {
    state: Mutex<State>,
}

enum GetOutcome {
    Hang,
    Done(Result<NodeClaim, kube::Error>),
}

impl FakeNodeClaimClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an existing claim, as if created earlier
    pub fn insert(&self, claim: NodeClaim) {
        let key = ClaimKey::of(&claim);
        self.state.lock().unwrap().objects.insert(key, claim);
    }

    /// Store a minimal claim with the given identity and labels
    pub fn insert_named(&self, key: &ClaimKey, labels: &[(&str, &str)]) {
        let mut claim = NodeClaim::new(&key.name, NodeClaimSpec::default());
        claim.metadata.namespace = Some(key.namespace.clone());
        claim.metadata.labels = Some(
            labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        self.insert(claim);
    }

    /// Overwrite the stored status of an existing claim, as the backend would.
    /// Does not count as a `get`.
    pub fn set_status(&self, key: &ClaimKey, conditions: Vec<Condition>) {
        if let Some(object) = self.state.lock().unwrap().objects.get_mut(key) {
            object.status = Some(NodeClaimStatus {
                conditions,
                ..Default::default()
            });
        }
    }

    /// Script the snapshots successive `get` calls observe for a claim
    pub fn script(&self, key: &ClaimKey, snapshots: Vec<Snapshot>) {
        self.state
            .lock()
            .unwrap()
            .scripts
            .insert(key.clone(), snapshots.into());
    }

    /// Make every `get` for this claim block forever
    pub fn hang(&self, key: &ClaimKey) {
        self.state.lock().unwrap().hanging.insert(key.clone());
    }

    pub fn fail_create(&self, code: u16, message: &str) {
        self.state.lock().unwrap().create_failure = Some((code, message.to_string()));
    }

    pub fn fail_list(&self, code: u16, message: &str) {
        self.state.lock().unwrap().list_failure = Some((code, message.to_string()));
    }

    /// Keys of claims newly created through `create`, in call order
    pub fn created(&self) -> Vec<ClaimKey> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn get_calls(&self, key: &ClaimKey) -> usize {
        self.state
            .lock()
            .unwrap()
            .get_calls
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    pub fn stored(&self, key: &ClaimKey) -> Option<NodeClaim> {
        self.state.lock().unwrap().objects.get(key).cloned()
    }

    fn next_get(&self, key: &ClaimKey) -> GetOutcome {
        let mut state = self.state.lock().unwrap();
        *state.get_calls.entry(key.clone()).or_default() += 1;

        if state.hanging.contains(key) {
            return GetOutcome::Hang;
        }

        let snapshot = state.scripts.get_mut(key).and_then(|script| {
            if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().cloned()
            }
        });

        let conditions = match snapshot {
            Some(Snapshot::Error { code, message }) => {
                return GetOutcome::Done(Err(api_error(code, reason_for(code), &message)));
            }
            Some(Snapshot::Conditions(conditions)) => Some(conditions),
            None => None,
        };

        let Some(object) = state.objects.get_mut(key) else {
            return GetOutcome::Done(Err(api_error(
                404,
                "NotFound",
                &format!("nodeclaims \"{}\" not found", key.name),
            )));
        };
        if let Some(conditions) = conditions {
            object.status = Some(NodeClaimStatus {
                conditions,
                ..Default::default()
            });
        }
        GetOutcome::Done(Ok(object.clone()))
    }
}

fn matches_selector(claim: &NodeClaim, selector: &str) -> bool {
    let labels = claim.labels();
    selector
        .split(',')
        .filter(|term| !term.is_empty())
        .all(|term| match term.split_once('=') {
            Some((k, v)) => labels.get(k).map(String::as_str) == Some(v),
            None => labels.contains_key(term),
        })
}

#[async_trait]
impl NodeClaimClient for FakeNodeClaimClient {
    async fn create(&self, claim: &NodeClaim) -> Result<(), kube::Error> {
        let mut state = self.state.lock().unwrap();
        if let Some((code, message)) = &state.create_failure {
            return Err(api_error(*code, reason_for(*code), message));
        }
        let key = ClaimKey::of(claim);
        if state.objects.contains_key(&key) {
            return Err(api_error(
                409,
                "AlreadyExists",
                &format!("nodeclaims \"{}\" already exists", key.name),
            ));
        }
        state.objects.insert(key.clone(), claim.clone());
        state.created.push(key);
        Ok(())
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<NodeClaim, kube::Error> {
        let key = ClaimKey::new(namespace, name);
        match self.next_get(&key) {
            GetOutcome::Hang => futures::future::pending().await,
            GetOutcome::Done(result) => result,
        }
    }

    async fn list(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<NodeClaim>, kube::Error> {
        let state = self.state.lock().unwrap();
        if let Some((code, message)) = &state.list_failure {
            return Err(api_error(*code, reason_for(*code), message));
        }
        Ok(state
            .objects
            .iter()
            .filter(|(key, claim)| {
                key.namespace == namespace && matches_selector(claim, label_selector)
            })
            .map(|(_, claim)| claim.clone())
            .collect())
    }
}
