//! Session registry: which cells each connected player controls.

use std::collections::BTreeMap;

/// One player's ordered cell list. Index 0 is the main cell.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub cells: Vec<u32>,
}

impl Session {
    /// The cohesion target, if the session still has any cell id.
    #[inline]
    pub fn main_cell(&self) -> Option<u32> {
        self.cells.first().copied()
    }
}

/// Owner id -> session.
///
/// Owner ids are handed out in increasing order by the gateway, so the
/// `BTreeMap` iterates sessions in the order players joined.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: BTreeMap<u32, Session>,
    max_cells: usize,
}

impl SessionRegistry {
    pub fn new(max_cells: usize) -> Self {
        Self {
            sessions: BTreeMap::new(),
            max_cells,
        }
    }

    /// Per-owner cell cap.
    #[inline]
    pub fn max_cells(&self) -> usize {
        self.max_cells
    }

    /// Start a session owning a single main cell, replacing any previous one.
    pub fn register(&mut self, owner_id: u32, main_cell: u32) -> Option<Session> {
        debug_assert!(
            self.owner_of(main_cell).is_none(),
            "cell {main_cell} already belongs to a session"
        );
        self.sessions.insert(owner_id, Session { cells: vec![main_cell] })
    }

    /// Delete a session, returning its cell list.
    pub fn remove(&mut self, owner_id: u32) -> Option<Session> {
        self.sessions.remove(&owner_id)
    }

    #[inline]
    pub fn get(&self, owner_id: u32) -> Option<&Session> {
        self.sessions.get(&owner_id)
    }

    #[inline]
    pub fn contains(&self, owner_id: u32) -> bool {
        self.sessions.contains_key(&owner_id)
    }

    /// Copy of an owner's cell ids, for phases that must not observe their own mutations.
    pub fn snapshot(&self, owner_id: u32) -> Option<Vec<u32>> {
        self.sessions.get(&owner_id).map(|s| s.cells.clone())
    }

    /// Append newly spawned cells to an owner's list.
    pub fn append(&mut self, owner_id: u32, new_cells: &[u32]) {
        debug_assert!(
            new_cells.iter().all(|&id| self.owner_of(id).is_none()),
            "split produced a cell id that is already owned"
        );
        if let Some(session) = self.sessions.get_mut(&owner_id) {
            session.cells.extend_from_slice(new_cells);
            debug_assert!(
                session.cells.len() <= self.max_cells,
                "session {owner_id} grew past its cap"
            );
        }
    }

    /// Drop one cell id from its owner's list. Returns true if the list is now empty.
    pub fn detach(&mut self, owner_id: u32, cell_id: u32) -> bool {
        match self.sessions.get_mut(&owner_id) {
            Some(session) => {
                session.cells.retain(|&id| id != cell_id);
                session.cells.is_empty()
            }
            None => false,
        }
    }

    /// Which owner lists `cell_id`, if any.
    pub fn owner_of(&self, cell_id: u32) -> Option<u32> {
        self.sessions
            .iter()
            .find(|(_, s)| s.cells.contains(&cell_id))
            .map(|(&owner, _)| owner)
    }

    /// Iterate sessions in join order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Session)> {
        self.sessions.iter().map(|(&owner, s)| (owner, s))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
