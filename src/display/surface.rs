use std::ops::{Deref, DerefMut};

use crate::display::target::ReusableTarget;

/// Host display surface that a converted target is published to.
///
/// Implementations wrap a platform bitmap (a writeable bitmap, a GPU
/// texture, a framebuffer). Writes must happen between `lock` and `unlock`,
/// and on the thread that owns the surface; marshalling onto that thread is
/// the caller's job.
pub trait DisplaySurface {
    /// Acquire the surface's update lock.
    fn lock(&mut self);

    /// Release the update lock taken by [`DisplaySurface::lock`].
    fn unlock(&mut self);

    /// Push the target's pixels to the surface. Only called while locked.
    fn publish(&mut self, target: &ReusableTarget);
}

/// Scoped update lock: locks on acquire, unlocks on drop.
///
/// Dropping the guard releases the lock on every exit path, including an
/// early return through `?` when conversion fails.
pub struct SurfaceGuard<'a, S: DisplaySurface + ?Sized> {
    surface: &'a mut S,
}

impl<'a, S: DisplaySurface + ?Sized> SurfaceGuard<'a, S> {
    pub fn acquire(surface: &'a mut S) -> Self {
        surface.lock();
        Self { surface }
    }
}

impl<S: DisplaySurface + ?Sized> Deref for SurfaceGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.surface
    }
}

impl<S: DisplaySurface + ?Sized> DerefMut for SurfaceGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.surface
    }
}

impl<S: DisplaySurface + ?Sized> Drop for SurfaceGuard<'_, S> {
    fn drop(&mut self) {
        self.surface.unlock();
    }
}
