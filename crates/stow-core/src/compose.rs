//! Fallback composition and one-way migration.

use std::fmt;
use std::marker::PhantomData;
use std::ops::Add;

use tracing::debug;

use crate::error::StorageResult;
use crate::storage::Storage;

/// Reads `primary`, then `fallback`; writes go to both.
///
/// When neither holds a value, [`get`](Storage::get) defers to the primary's
/// default. Keeping both sides in sync on write means a later read through
/// either side alone sees the same value.
#[derive(Clone)]
pub struct Compose<A, B> {
    primary: A,
    fallback: B,
}

impl<A, B> Compose<A, B>
where
    A: Storage,
    B: Storage<Content = A::Content>,
{
    pub fn new(primary: A, fallback: B) -> Self {
        Self { primary, fallback }
    }

    pub fn primary(&self) -> &A {
        &self.primary
    }

    pub fn fallback(&self) -> &B {
        &self.fallback
    }

    pub fn into_parts(self) -> (A, B) {
        (self.primary, self.fallback)
    }
}

impl<A, B> Storage for Compose<A, B>
where
    A: Storage,
    B: Storage<Content = A::Content>,
{
    type Content = A::Content;

    fn content(&self) -> Option<A::Content> {
        self.primary.content().or_else(|| self.fallback.content())
    }

    /// Both sides are always attempted; the first error wins.
    fn set_content(&self, content: Option<A::Content>) -> StorageResult<()> {
        let primary = self.primary.set_content(content.clone());
        let fallback = self.fallback.set_content(content);
        primary.and(fallback)
    }

    fn get(&self) -> A::Content {
        self.content().unwrap_or_else(|| self.primary.get())
    }
}

impl<A, B> fmt::Debug for Compose<A, B>
where
    A: fmt::Debug,
    B: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ?? {:?}", self.primary, self.fallback)
    }
}

impl<A, B, Rhs> Add<Rhs> for Compose<A, B>
where
    A: Storage,
    B: Storage<Content = A::Content>,
    Rhs: Storage<Content = A::Content>,
{
    type Output = Compose<Self, Rhs>;

    fn add(self, rhs: Rhs) -> Self::Output {
        Compose::new(self, rhs)
    }
}

/// A read-only view of a legacy storage converted to a new content type.
///
/// Writes are accepted and ignored, so that composing a new key over a
/// migration (`new.migrate_from(old, f)`) writes the new key only and the
/// legacy value stays untouched.
pub struct Migrate<A, F, New> {
    legacy: A,
    convert: F,
    _new: PhantomData<fn() -> New>,
}

impl<A, F, New> Migrate<A, F, New>
where
    A: Storage,
    F: Fn(A::Content) -> New,
    New: Clone,
{
    pub fn new(legacy: A, convert: F) -> Self {
        Self {
            legacy,
            convert,
            _new: PhantomData,
        }
    }

    pub fn legacy(&self) -> &A {
        &self.legacy
    }
}

impl<A, F, New> Storage for Migrate<A, F, New>
where
    A: Storage,
    F: Fn(A::Content) -> New,
    New: Clone,
{
    type Content = New;

    fn content(&self) -> Option<New> {
        self.legacy.content().map(&self.convert)
    }

    fn set_content(&self, _content: Option<New>) -> StorageResult<()> {
        debug!("write to a migration view ignored");
        Ok(())
    }

    fn get(&self) -> New {
        (self.convert)(self.legacy.get())
    }
}

impl<A: Clone, F: Clone, New> Clone for Migrate<A, F, New> {
    fn clone(&self) -> Self {
        Self {
            legacy: self.legacy.clone(),
            convert: self.convert.clone(),
            _new: PhantomData,
        }
    }
}

impl<A: fmt::Debug, F, New> fmt::Debug for Migrate<A, F, New> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "migrate({:?})", self.legacy)
    }
}

impl<A, F, New, Rhs> Add<Rhs> for Migrate<A, F, New>
where
    A: Storage,
    F: Fn(A::Content) -> New,
    New: Clone,
    Rhs: Storage<Content = New>,
{
    type Output = Compose<Self, Rhs>;

    fn add(self, rhs: Rhs) -> Self::Output {
        Compose::new(self, rhs)
    }
}
