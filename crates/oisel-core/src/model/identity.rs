//! Target, instrument-mode and night identities.
//!
//! Files name targets and instruments freely ("HD 1234", "HD_1234"). The
//! managers map such names onto one UID per physical target / instrument
//! mode; granules and selectors only ever compare UIDs.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::range::Range;

/// Nights start at local noon: `NIGHT_ID = floor(MJD - NIGHT_OFFSET)`.
pub const NIGHT_OFFSET: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NightId(pub i32);

impl NightId {
    pub fn from_mjd(mjd: f64) -> Self {
        NightId((mjd - NIGHT_OFFSET).floor() as i32)
    }
}

impl fmt::Display for NightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Upper-case and strip blanks, `_` and `-`.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(|c| c.to_uppercase())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Target {
    pub uid: String,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uid)
    }
}

/// Name → target UID resolution.
///
/// The first name registered for a target becomes its UID; later names that
/// normalize the same way, or explicit aliases, resolve to it.
#[derive(Debug, Clone, Default)]
pub struct TargetManager {
    /// normalized name or alias → uid
    aliases: BTreeMap<String, String>,
    /// uid → every raw name seen for it
    names: BTreeMap<String, BTreeSet<String>>,
}

impl TargetManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a raw name and return its UID.
    pub fn register(&mut self, name: &str) -> Target {
        let key = normalize_name(name);
        let uid = match self.aliases.get(&key) {
            Some(uid) => uid.clone(),
            None => {
                let uid = name.trim().to_string();
                self.aliases.insert(key, uid.clone());
                uid
            }
        };
        self.names
            .entry(uid.clone())
            .or_default()
            .insert(name.to_string());
        Target { uid }
    }

    /// Declare `alias` as another name of the target `uid`.
    pub fn add_alias(&mut self, alias: &str, uid: &str) {
        self.aliases.insert(normalize_name(alias), uid.to_string());
        self.names
            .entry(uid.to_string())
            .or_default()
            .insert(alias.to_string());
    }

    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.aliases.get(&normalize_name(name)).map(|s| s.as_str())
    }

    /// Does the raw `name` designate the target `uid`?
    pub fn matches(&self, uid: &str, name: &str) -> bool {
        match self.resolve(name) {
            Some(resolved) => resolved == uid || normalize_name(resolved) == normalize_name(uid),
            None => normalize_name(name) == normalize_name(uid),
        }
    }

    /// Raw names seen for `uid`.
    pub fn names_of(&self, uid: &str) -> Option<&BTreeSet<String>> {
        self.names.get(uid)
    }

    pub fn uids(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(|s| s.as_str())
    }
}

/// UID of the mode built from `ins_name` with `nb_channels` channels:
/// normalized INSNAME and channel count, e.g. `PIONIERPNAT_6`.
pub fn ins_mode_uid(ins_name: &str, nb_channels: usize) -> String {
    format!("{}_{}", normalize_name(ins_name), nb_channels)
}

/// Does the selector name `name` designate the mode of (`ins_name`,
/// `nb_channels`)? A bare INSNAME designates every channel count, a full
/// UID only its own.
pub fn designates_ins_mode(name: &str, ins_name: &str, nb_channels: usize) -> bool {
    let name = name.trim();
    name.eq_ignore_ascii_case(&ins_mode_uid(ins_name, nb_channels))
        || normalize_name(name) == normalize_name(ins_name)
}

/// Instrument mode: named channel configuration shared by data tables.
///
/// Identity is the UID only, which carries the channel count: two
/// wavelength tables sharing an INSNAME with different widths are two
/// modes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentMode {
    pub uid: String,
    pub ins_name: String,
    pub nb_channels: usize,
    pub wavelength: Range,
}

impl InstrumentMode {
    pub fn designated_by(&self, name: &str) -> bool {
        designates_ins_mode(name, &self.ins_name, self.nb_channels)
    }
}

impl PartialEq for InstrumentMode {
    fn eq(&self, other: &Self) -> bool {
        self.uid == other.uid
    }
}

impl Eq for InstrumentMode {}

impl Hash for InstrumentMode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uid.hash(state);
    }
}

impl PartialOrd for InstrumentMode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for InstrumentMode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.uid.cmp(&other.uid)
    }
}

impl fmt::Display for InstrumentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uid)
    }
}

/// INSNAME + channel count → instrument mode.
#[derive(Debug, Clone, Default)]
pub struct InstrumentModeManager {
    modes: BTreeMap<(String, usize), InstrumentMode>,
}

impl InstrumentModeManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, ins_name: &str, nb_channels: usize, wavelength: Range) -> InstrumentMode {
        let key = (normalize_name(ins_name), nb_channels);
        let mode = self.modes.entry(key).or_insert_with(|| InstrumentMode {
            uid: ins_mode_uid(ins_name, nb_channels),
            ins_name: ins_name.trim().to_string(),
            nb_channels,
            wavelength,
        });
        // widen to every wavelength table registered under this mode
        if wavelength.is_finite() {
            mode.wavelength.include(wavelength.min);
            mode.wavelength.include(wavelength.max);
        }
        mode.clone()
    }

    pub fn resolve(&self, ins_name: &str, nb_channels: usize) -> Option<&InstrumentMode> {
        self.modes.get(&(normalize_name(ins_name), nb_channels))
    }

    /// Does the mode of (`ins_name`, `nb_channels`) answer to `name`?
    pub fn matches(&self, name: &str, ins_name: &str, nb_channels: usize) -> bool {
        match self.resolve(ins_name, nb_channels) {
            Some(mode) => mode.designated_by(name),
            None => designates_ins_mode(name, ins_name, nb_channels),
        }
    }

    pub fn modes(&self) -> impl Iterator<Item = &InstrumentMode> {
        self.modes.values()
    }
}

/// File-local TARGET_ID values designating one target UID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetIdMatcher {
    ids: BTreeSet<i16>,
}

impl TargetIdMatcher {
    pub fn new(ids: BTreeSet<i16>) -> Self {
        Self { ids }
    }

    pub fn ids(&self) -> &BTreeSet<i16> {
        &self.ids
    }

    #[inline]
    pub fn matches(&self, target_id: i16) -> bool {
        self.ids.contains(&target_id)
    }

    /// Every id of `distinct` matches.
    pub fn match_all(&self, distinct: &BTreeSet<i16>) -> bool {
        distinct.iter().all(|id| self.ids.contains(id))
    }

    pub fn match_any(&self, distinct: &BTreeSet<i16>) -> bool {
        distinct.iter().any(|id| self.ids.contains(id))
    }
}
