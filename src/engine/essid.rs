// ESSID registry
//
// Groups nodes by advertised network name. Nodes without a known name sit in
// the reserved hidden group until their BSSID is correlated with a named
// group, after which the hidden group is marked split and attribution for
// that BSSID goes to the named group for good.

use super::node::NodeId;
use crate::wlan::{MacAddr, MAX_ESSID_LEN};
use std::collections::{BTreeSet, HashMap};

/// Handle of an ESSID group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EssidId(u32);

impl EssidId {
    /// The reserved hidden/unknown group
    pub const HIDDEN: EssidId = EssidId(0);

    pub fn is_hidden(self) -> bool {
        self == Self::HIDDEN
    }
}

/// When a named ESSID may claim a BSSID for hidden-group redirection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SplitTrigger {
    /// Any frame carrying a name (beacon or probe response)
    #[default]
    AnyFrame,
    /// Only probe responses, the frames that answer a hidden-SSID probe
    ProbeResponse,
}

/// One network name and the nodes attributed to it
#[derive(Debug, Clone)]
pub struct EssidGroup {
    id: EssidId,
    name: String,
    members: BTreeSet<NodeId>,
    /// BSSIDs correlated with this name
    bssids: BTreeSet<MacAddr>,
    split: bool,
    split_essid: Option<EssidId>,
}

impl EssidGroup {
    fn new(id: EssidId, name: String) -> Self {
        Self {
            id,
            name,
            members: BTreeSet::new(),
            bssids: BTreeSet::new(),
            split: false,
            split_essid: None,
        }
    }

    pub fn id(&self) -> EssidId {
        self.id
    }

    /// Advertised name, empty for the hidden group
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_hidden(&self) -> bool {
        self.id.is_hidden()
    }

    pub fn members(&self) -> &BTreeSet<NodeId> {
        &self.members
    }

    /// Member count, always the size of the member set
    pub fn num_nodes(&self) -> usize {
        self.members.len()
    }

    pub fn bssids(&self) -> &BTreeSet<MacAddr> {
        &self.bssids
    }

    pub fn is_split(&self) -> bool {
        self.split
    }

    /// Named group that hidden attribution was last redirected to
    pub fn split_essid(&self) -> Option<EssidId> {
        self.split_essid
    }
}

/// Outcome of [`EssidRegistry::resolve`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub group: EssidId,
    /// BSSID newly correlated with `group`; hidden members on it must move
    pub correlated: Option<MacAddr>,
}

/// All ESSID groups plus the hidden pseudo-group
#[derive(Debug, Clone)]
pub struct EssidRegistry {
    hidden: EssidGroup,
    /// Named groups, `EssidId(n)` lives at `named[n - 1]`
    named: Vec<EssidGroup>,
    by_name: HashMap<String, EssidId>,
    by_bssid: HashMap<MacAddr, EssidId>,
    trigger: SplitTrigger,
}

impl EssidRegistry {
    pub fn new(trigger: SplitTrigger) -> Self {
        Self {
            hidden: EssidGroup::new(EssidId::HIDDEN, String::new()),
            named: Vec::new(),
            by_name: HashMap::new(),
            by_bssid: HashMap::new(),
            trigger,
        }
    }

    /// Group for a name/BSSID pair, creating a named group on first sight
    ///
    /// An empty name resolves to the hidden group unless the BSSID has
    /// already been correlated with a named group.
    pub fn resolve(&mut self, essid: &str, bssid: MacAddr, probe_response: bool) -> Resolution {
        let essid = clamp_essid(essid);
        if essid.is_empty() {
            let redirect = bssid
                .is_unicast_identity()
                .then(|| self.by_bssid.get(&bssid).copied())
                .flatten();
            return match redirect {
                Some(named) => {
                    self.mark_hidden_split(named);
                    Resolution { group: named, correlated: None }
                }
                None => Resolution { group: EssidId::HIDDEN, correlated: None },
            };
        }

        let id = match self.by_name.get(essid) {
            Some(&id) => id,
            None => {
                let id = EssidId(self.named.len() as u32 + 1);
                self.named.push(EssidGroup::new(id, essid.to_string()));
                self.by_name.insert(essid.to_string(), id);
                tracing::debug!(essid = %essid, "new ESSID");
                id
            }
        };

        let may_correlate = match self.trigger {
            SplitTrigger::AnyFrame => true,
            SplitTrigger::ProbeResponse => probe_response,
        };
        let correlated = if may_correlate
            && bssid.is_unicast_identity()
            && !self.by_bssid.contains_key(&bssid)
        {
            self.by_bssid.insert(bssid, id);
            if let Some(group) = self.group_mut(id) {
                group.bssids.insert(bssid);
            }
            Some(bssid)
        } else {
            None
        };

        Resolution { group: id, correlated }
    }

    /// Record that hidden attribution was redirected to `target`
    pub(crate) fn mark_hidden_split(&mut self, target: EssidId) {
        if !self.hidden.split {
            tracing::debug!(essid = ?target, "hidden ESSID split");
        }
        self.hidden.split = true;
        self.hidden.split_essid = Some(target);
    }

    pub(crate) fn attach(&mut self, node: NodeId, group: EssidId) {
        if let Some(g) = self.group_mut(group) {
            g.members.insert(node);
        }
    }

    /// Remove a node from a group; `false` if it was not a member
    pub fn detach(&mut self, node: NodeId, group: EssidId) -> bool {
        self.group_mut(group).is_some_and(|g| g.members.remove(&node))
    }

    /// Named group a BSSID is correlated with
    pub fn correlated_group(&self, bssid: &MacAddr) -> Option<EssidId> {
        self.by_bssid.get(bssid).copied()
    }

    pub fn get(&self, id: EssidId) -> Option<&EssidGroup> {
        if id.is_hidden() {
            Some(&self.hidden)
        } else {
            self.named.get(id.0 as usize - 1)
        }
    }

    fn group_mut(&mut self, id: EssidId) -> Option<&mut EssidGroup> {
        if id.is_hidden() {
            Some(&mut self.hidden)
        } else {
            self.named.get_mut(id.0 as usize - 1)
        }
    }

    pub fn get_by_name(&self, essid: &str) -> Option<&EssidGroup> {
        self.by_name.get(essid).and_then(|&id| self.get(id))
    }

    pub fn hidden(&self) -> &EssidGroup {
        &self.hidden
    }

    /// Named groups in creation order
    pub fn iter(&self) -> impl Iterator<Item = &EssidGroup> {
        self.named.iter()
    }

    /// Named groups followed by the hidden group
    pub fn iter_all(&self) -> impl Iterator<Item = &EssidGroup> {
        self.named.iter().chain(std::iter::once(&self.hidden))
    }

    /// Number of named groups
    pub fn len(&self) -> usize {
        self.named.len()
    }

    pub fn is_empty(&self) -> bool {
        self.named.is_empty()
    }

    pub fn trigger(&self) -> SplitTrigger {
        self.trigger
    }
}

/// Cut a name to at most `MAX_ESSID_LEN` bytes on a char boundary
fn clamp_essid(essid: &str) -> &str {
    if essid.len() <= MAX_ESSID_LEN {
        return essid;
    }
    let mut end = MAX_ESSID_LEN;
    while !essid.is_char_boundary(end) {
        end -= 1;
    }
    &essid[..end]
}
