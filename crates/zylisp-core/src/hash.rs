use hashbrown::HashMap;

use crate::error::ZyError;
use crate::value::Sexp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashKind {
    Hash,
    Struct,
    Field,
    MsgMap,
}

impl HashKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashKind::Hash => "hash",
            HashKind::Struct => "struct",
            HashKind::Field => "field",
            HashKind::MsgMap => "msgmap",
        }
    }

    /// Struct and field hashes are typed nominally by their declared name.
    pub fn is_nominal(&self) -> bool {
        matches!(self, HashKind::Struct | HashKind::Field)
    }
}

/// Insertion-ordered map. `order` holds every key of `map` exactly once,
/// at the position of its first insertion.
#[derive(Debug, Clone)]
pub struct SexpHash {
    kind: HashKind,
    type_name: String,
    map: HashMap<Sexp, Sexp>,
    order: Vec<Sexp>,
}

impl SexpHash {
    pub fn new() -> Self {
        Self::with_kind(HashKind::Hash, "hash")
    }

    pub fn with_kind(kind: HashKind, type_name: impl Into<String>) -> Self {
        SexpHash {
            kind,
            type_name: type_name.into(),
            map: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn kind(&self) -> HashKind {
        self.kind
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, key: &Sexp) -> bool {
        self.map.contains_key(key)
    }

    pub fn get(&self, key: &Sexp) -> Result<Sexp, ZyError> {
        self.map
            .get(key)
            .cloned()
            .ok_or_else(|| ZyError::field_not_found(key))
    }

    pub fn get_or(&self, key: &Sexp, default: Sexp) -> Sexp {
        self.map.get(key).cloned().unwrap_or(default)
    }

    /// Field lookup by name: a symbol key first, then a string key.
    pub fn get_field(&self, name: &str) -> Option<Sexp> {
        self.map
            .get(&Sexp::symbol(name))
            .or_else(|| self.map.get(&Sexp::string(name)))
            .cloned()
    }

    /// Checked insert for keys coming from user code. Arrays and hashes
    /// hash by content and can change after insertion, so they are refused.
    pub fn insert(&mut self, key: Sexp, value: Sexp) -> Result<(), ZyError> {
        Self::check_key(&key)?;
        self.set(key, value);
        Ok(())
    }

    /// Fails for keys [`SexpHash::insert`] would refuse. Call it before
    /// mutably borrowing a hash that may itself be the key.
    pub fn check_key(key: &Sexp) -> Result<(), ZyError> {
        if is_stable_key(key) {
            Ok(())
        } else {
            Err(ZyError::type_error("immutable hash key", key.type_name()))
        }
    }

    pub fn set(&mut self, key: Sexp, value: Sexp) {
        if self.map.insert(key.clone(), value).is_none() {
            self.order.push(key);
        }
    }

    /// Removes `key` if present. Missing keys are not an error.
    pub fn delete(&mut self, key: &Sexp) {
        // never inserted; hashing a hash key here could re-borrow this hash
        if !is_stable_key(key) {
            return;
        }
        if self.map.remove(key).is_some() {
            self.order.retain(|k| k != key);
        }
    }

    pub fn keys(&self) -> &[Sexp] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Sexp, &Sexp)> + '_ {
        self.order
            .iter()
            .filter_map(move |k| self.map.get(k).map(|v| (k, v)))
    }

    /// The `pos`-th entry in key order.
    pub fn pair_at(&self, pos: i64) -> Result<(Sexp, Sexp), ZyError> {
        let idx = usize::try_from(pos)
            .ok()
            .filter(|i| *i < self.order.len())
            .ok_or(ZyError::IndexOutOfBounds {
                index: pos,
                len: self.order.len(),
            })?;
        let key = self.order[idx].clone();
        let value = self.get(&key)?;
        Ok((key, value))
    }

    /// Replace contents with those of `other`, keeping this hash's identity.
    pub fn clone_from_hash(&mut self, other: &SexpHash) {
        self.kind = other.kind;
        self.type_name = other.type_name.clone();
        self.map = other.map.clone();
        self.order = other.order.clone();
    }
}

fn is_stable_key(key: &Sexp) -> bool {
    match key {
        Sexp::Array(_) | Sexp::Hash(_) => false,
        Sexp::Pair(p) => is_stable_key(&p.head) && is_stable_key(&p.tail),
        _ => true,
    }
}

impl Default for SexpHash {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for SexpHash {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.type_name == other.type_name
            && self.order == other.order
            && self.map == other.map
    }
}
