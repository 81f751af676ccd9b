//! Insertion admission filter.
//!
//! Storage units never hold another storage unit or a networked proxy of one.
//! Proxy ids are matched loosely, so coincidental text matches are rejected
//! as well.

use crate::catalog::ItemRegistry;
use crate::codec;
use bulkstore_core::ItemStack;
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

/// Container ids that are always rejected, in canonical uppercase form.
pub const BLOCKED_IDS: &[&str] = &[
    "BASIC_STORAGE",
    "ADVANCED_STORAGE",
    "REINFORCED_STORAGE",
    "VOID_STORAGE",
    "INFINITY_STORAGE",
];

/// A match rule evaluated against uppercase text.
#[derive(Debug, Clone, Copy)]
enum TextPattern {
    /// Text contains the token.
    Contains(&'static str),
    /// Text contains every token, anywhere.
    AllOf(&'static [&'static str]),
}

impl TextPattern {
    fn matches(self, upper: &str) -> bool {
        match self {
            Self::Contains(token) => upper.contains(token),
            Self::AllOf(tokens) => tokens.iter().all(|token| upper.contains(token)),
        }
    }
}

/// Remote-proxy ids: separator (`_`, `-`) × namespace prefix (bare, `:`),
/// then the loose co-occurrence fallback.
const PROXY_ID_PATTERNS: &[TextPattern] = &[
    TextPattern::Contains("NETWORK_QUANTUM"),
    TextPattern::Contains("NETWORK-QUANTUM"),
    TextPattern::Contains(":NETWORK_QUANTUM"),
    TextPattern::Contains(":NETWORK-QUANTUM"),
    TextPattern::AllOf(&["NETWORK", "QUANTUM"]),
];

/// Display name and lore patterns for items the registry cannot vouch for.
const LABEL_PATTERNS: &[TextPattern] = &[
    TextPattern::AllOf(&["NETWORK", "QUANTUM"]),
    TextPattern::AllOf(&["QUANTUM", "STORAGE"]),
];

/// Why an item was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Registry id is a storage container.
    Denylisted(String),
    /// Registry id looks like a networked storage proxy.
    NetworkProxy(String),
    /// Item renders a unit's contents.
    DisplayMarker,
    /// Item embeds a payload whose type is itself rejected.
    NestedContainer(String),
    /// Display name reads like a storage proxy.
    SuspiciousName(String),
    /// A lore line reads like a storage proxy.
    SuspiciousLore(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Denylisted(id) => write!(f, "denylisted container id {id}"),
            Self::NetworkProxy(id) => write!(f, "network storage proxy id {id}"),
            Self::DisplayMarker => write!(f, "storage display item"),
            Self::NestedContainer(id) => write!(f, "embedded container payload {id}"),
            Self::SuspiciousName(name) => write!(f, "suspicious display name {name:?}"),
            Self::SuspiciousLore(line) => write!(f, "suspicious lore line {line:?}"),
        }
    }
}

/// Decides which items may ever be counted by a storage unit.
#[derive(Debug, Clone)]
pub struct AdmissionFilter {
    denylist: BTreeSet<String>,
    log_rejections: bool,
}

impl Default for AdmissionFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl AdmissionFilter {
    /// Filter with the built-in denylist and rejection logging off.
    pub fn new() -> Self {
        Self {
            denylist: BLOCKED_IDS.iter().map(|id| id.to_string()).collect(),
            log_rejections: false,
        }
    }

    /// Add more container ids to the denylist (any case).
    pub fn with_blocked_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.denylist.extend(
            ids.into_iter()
                .map(|id| id.as_ref().trim().to_uppercase())
                .filter(|id| !id.is_empty()),
        );
        self
    }

    /// Emit a debug event for every rejection.
    pub fn with_rejection_logging(mut self, enabled: bool) -> Self {
        self.log_rejections = enabled;
        self
    }

    /// Denylisted ids, uppercase.
    pub fn blocked_ids(&self) -> impl Iterator<Item = &str> {
        self.denylist.iter().map(String::as_str)
    }

    /// True when `item` may be inserted into a storage unit.
    pub fn is_admissible(&self, item: &ItemStack, registry: &dyn ItemRegistry) -> bool {
        match self.check(item, registry) {
            Ok(()) => true,
            Err(rejection) => {
                if self.log_rejections {
                    debug!(material = %item.material, %rejection, "storage insert rejected");
                }
                false
            }
        }
    }

    /// Full decision with the reason for a rejection.
    pub fn check(&self, item: &ItemStack, registry: &dyn ItemRegistry) -> Result<(), Rejection> {
        if let Some(id) = registry.resolve_id(item) {
            self.check_id(&id)?;
        }

        let Some(meta) = item.meta() else {
            return Ok(());
        };

        if meta.data.get_byte(&codec::display_key()).is_some() {
            return Err(Rejection::DisplayMarker);
        }

        if let Some(inner) = codec::decode_embedded(item) {
            if let Some(inner_id) = registry.resolve_id(&inner) {
                if self.check_id(&inner_id).is_err() {
                    return Err(Rejection::NestedContainer(inner_id));
                }
            }
        }

        if let Some(name) = meta.display_name.as_deref() {
            if suspicious_label(name) {
                return Err(Rejection::SuspiciousName(name.to_string()));
            }
        }

        for line in meta.lore.iter().flatten() {
            if suspicious_label(line) {
                return Err(Rejection::SuspiciousLore(line.clone()));
            }
        }

        Ok(())
    }

    fn check_id(&self, id: &str) -> Result<(), Rejection> {
        let upper = id.trim().to_uppercase();
        if self.denylist.contains(&upper) {
            return Err(Rejection::Denylisted(id.to_string()));
        }
        if PROXY_ID_PATTERNS.iter().any(|pattern| pattern.matches(&upper)) {
            return Err(Rejection::NetworkProxy(id.to_string()));
        }
        Ok(())
    }
}

fn suspicious_label(text: &str) -> bool {
    let upper = text.to_uppercase();
    LABEL_PATTERNS.iter().any(|pattern| pattern.matches(&upper))
}
