//! Name-addressed requests and replies
//!
//! These are the in-memory views the forwarding strategies act on. Packet
//! framing beyond the attached [`TagSet`] belongs to the surrounding
//! forwarder.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use geofwd_core::{FaceId, Point2D};

use crate::tag_set::TagSet;

/// Hierarchical name such as `/12.5/40/video/seg=3`
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name {
    components: Vec<String>,
}

impl Name {
    /// The root name `/`
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a name from already-split components
    pub fn from_components<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            components: components.into_iter().map(Into::into).collect(),
        }
    }

    /// Name components in order
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Number of components
    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Return a new name with `component` appended
    pub fn append(&self, component: impl fmt::Display) -> Self {
        let mut components = self.components.clone();
        components.push(component.to_string());
        Self { components }
    }

    /// Check whether this name begins with `prefix`
    pub fn starts_with(&self, prefix: &Name) -> bool {
        self.components.starts_with(&prefix.components)
    }

    /// The first `count` components as a name
    pub fn prefix(&self, count: usize) -> Self {
        Self {
            components: self.components.iter().take(count).cloned().collect(),
        }
    }

    /// Interpret the first two components as `x` and `y` coordinates
    ///
    /// Content published under `/<x>/<y>/...` advertises where it lives.
    /// Returns `None` when the name is shorter than two components or either
    /// component is not a finite number.
    pub fn leading_coordinates(&self) -> Option<Point2D> {
        let [x, y, ..] = self.components.as_slice() else {
            return None;
        };
        let x: f64 = x.parse().ok()?;
        let y: f64 = y.parse().ok()?;
        (x.is_finite() && y.is_finite()).then(|| Point2D::new(x, y))
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return f.write_str("/");
        }
        for component in &self.components {
            write!(f, "/{}", component)?;
        }
        Ok(())
    }
}

impl FromStr for Name {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_components(
            s.split('/').filter(|component| !component.is_empty()),
        ))
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Self::from_components(s.split('/').filter(|component| !component.is_empty()))
    }
}

/// A request for named content
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub name: Name,
    /// Distinguishes retransmissions from distinct requests for the same name
    pub nonce: u32,
    pub lifetime: Duration,
    /// Remaining hops; `None` means unlimited
    pub hop_limit: Option<u8>,
    pub tags: TagSet,
}

impl Request {
    /// Default lifetime of a request
    pub const DEFAULT_LIFETIME: Duration = Duration::from_secs(4);

    /// Create a request with the default lifetime and no tags
    pub fn new(name: impl Into<Name>, nonce: u32) -> Self {
        Self {
            name: name.into(),
            nonce,
            lifetime: Self::DEFAULT_LIFETIME,
            hop_limit: None,
            tags: TagSet::new(),
        }
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn with_hop_limit(mut self, hop_limit: u8) -> Self {
        self.hop_limit = Some(hop_limit);
        self
    }

    pub fn with_tags(mut self, tags: TagSet) -> Self {
        self.tags = tags;
        self
    }
}

/// A reply carrying named content back toward the requester
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub name: Name,
    pub freshness: Duration,
    pub tags: TagSet,
    /// Face the producer asked the forwarder to use, if any
    pub next_hop_face: Option<FaceId>,
}

impl Reply {
    /// Create a reply with zero freshness and no tags
    pub fn new(name: impl Into<Name>) -> Self {
        Self {
            name: name.into(),
            freshness: Duration::ZERO,
            tags: TagSet::new(),
            next_hop_face: None,
        }
    }

    pub fn with_freshness(mut self, freshness: Duration) -> Self {
        self.freshness = freshness;
        self
    }

    pub fn with_tags(mut self, tags: TagSet) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_next_hop_face(mut self, face: FaceId) -> Self {
        self.next_hop_face = Some(face);
        self
    }
}
