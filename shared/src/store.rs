use crate::viewport::Viewport;

/// Handle returned by [`ViewportStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&Viewport)>;

/// Single owner of the current viewport.
///
/// Writers replace the whole value; listeners are told about every change in
/// the order they subscribed. Writing an identical value is not a change.
pub struct ViewportStore {
    current: Viewport,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
}

impl Default for ViewportStore {
    fn default() -> Self {
        Self::new(Viewport::identity())
    }
}

impl std::fmt::Debug for ViewportStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewportStore")
            .field("current", &self.current)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl ViewportStore {
    pub fn new(initial: Viewport) -> Self {
        Self {
            current: initial,
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    pub fn get(&self) -> Viewport {
        self.current
    }

    pub fn set(&mut self, viewport: Viewport) {
        if viewport == self.current {
            return;
        }
        self.current = viewport;
        for (_, listener) in &mut self.listeners {
            listener(&viewport);
        }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&Viewport) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }
}
