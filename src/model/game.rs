//! The game tree.
//!
//! A [`Game`] owns a tree of [`GameNode`]s inside a [`NodePool`]
//! arena. Edges run parent to child through owned `NodeId`s; the
//! parent link is a plain back-reference that never owns. Child 0 of
//! every node is the mainline, later children are sidelines in the
//! order a GUI should display them.
//!
//! Besides the tree a game carries its PGN headers (insertion
//! ordered, the seven-tag roster always present), the result, a dirty
//! bit for GUI redraws, and lazily supplied ECO information.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{Board, Move};

/// Nodes preallocated per game; bulk PGN loading reuses them through
/// the free list instead of hitting the allocator per node.
const POOL_RESERVE: usize = 512;

static NEXT_NODE_UID: AtomicU32 = AtomicU32::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameResult {
    Undefined,
    WhiteWins,
    BlackWins,
    Draw,
    /// Wildcard used by position searches.
    Any,
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::WhiteWins => "1-0",
            Self::BlackWins => "0-1",
            Self::Draw => "1/2-1/2",
            Self::Undefined | Self::Any => "*",
        };
        f.write_str(s)
    }
}

/// Opening classification as supplied by an external classifier.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EcoInfo {
    pub code: String,
    pub info: String,
}

/// Handle into a game's node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

/// One node of the tree: the move that led here, the position after
/// it, and everything annotated onto it.
#[derive(Debug, Clone)]
pub struct GameNode {
    uid: u32,
    mv: Option<Move>,
    board: Board,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    comment: String,
    nags: BTreeSet<u16>,
}

impl GameNode {
    /// Process-unique id, stable for the node's lifetime. GUIs use it
    /// to address nodes across tree edits.
    pub fn id(&self) -> u32 {
        self.uid
    }

    /// The move leading to this node; the root has none.
    pub fn mv(&self) -> Option<Move> {
        self.mv
    }

    /// Position after this node's move.
    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    pub(crate) fn set_board(&mut self, board: Board) {
        self.board = board;
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child variations; index 0 is the mainline continuation.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = comment.into();
    }

    pub fn nags(&self) -> &BTreeSet<u16> {
        &self.nags
    }

    pub fn add_nag(&mut self, nag: u16) {
        self.nags.insert(nag);
    }

    pub fn clear_nags(&mut self) {
        self.nags.clear();
    }

    fn reset(&mut self) {
        self.mv = None;
        self.parent = None;
        self.children.clear();
        self.comment.clear();
        self.nags.clear();
    }
}

/// Arena of game nodes with a free list.
///
/// `reserve` fills the free list up front, `make_node` pops from it
/// (growing when empty), and `release_subtree` hands a whole subtree
/// back. Recycled slots get a fresh uid, so stale ids never alias a
/// reused node.
pub struct NodePool {
    nodes: Vec<GameNode>,
    free: Vec<NodeId>,
}

impl NodePool {
    pub fn reserve(capacity: usize) -> Self {
        let mut pool = Self { nodes: Vec::with_capacity(capacity), free: Vec::with_capacity(capacity) };
        for _ in 0..capacity {
            let id = NodeId(pool.nodes.len() as u32);
            pool.nodes.push(GameNode {
                uid: 0,
                mv: None,
                board: Board::new(),
                parent: None,
                children: Vec::new(),
                comment: String::new(),
                nags: BTreeSet::new(),
            });
            pool.free.push(id);
        }
        pool
    }

    pub fn make_node(&mut self, mv: Option<Move>, board: Board, parent: Option<NodeId>) -> NodeId {
        let uid = NEXT_NODE_UID.fetch_add(1, Ordering::Relaxed);
        let id = match self.free.pop() {
            Some(id) => id,
            None => {
                log::debug!("node pool exhausted, growing");
                let id = NodeId(self.nodes.len() as u32);
                self.nodes.push(GameNode {
                    uid: 0,
                    mv: None,
                    board: Board::new(),
                    parent: None,
                    children: Vec::new(),
                    comment: String::new(),
                    nags: BTreeSet::new(),
                });
                id
            }
        };
        let node = &mut self.nodes[id.0 as usize];
        node.reset();
        node.uid = uid;
        node.mv = mv;
        node.board = board;
        node.parent = parent;
        id
    }

    /// Return a node and all its descendants to the free list.
    pub fn release_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            let children = std::mem::take(&mut self.nodes[n.0 as usize].children);
            stack.extend(children);
            self.nodes[n.0 as usize].reset();
            self.free.push(n);
        }
    }

    pub fn node(&self, id: NodeId) -> &GameNode {
        &self.nodes[id.0 as usize]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut GameNode {
        &mut self.nodes[id.0 as usize]
    }

    #[cfg(test)]
    fn free_count(&self) -> usize {
        self.free.len()
    }
}

/// A chess game: tree, cursor, result, headers.
pub struct Game {
    pool: NodePool,
    root: NodeId,
    current: NodeId,
    result: GameResult,
    headers: IndexMap<String, String>,
    tree_changed: bool,
    eco: Option<EcoInfo>,
}

impl Game {
    /// A fresh game from the standard initial position.
    pub fn new() -> Self {
        Self::from_board(Board::startpos())
    }

    /// A fresh game whose root holds the supplied position. The board
    /// must be valid; nothing is checked here.
    pub fn from_board(board: Board) -> Self {
        let mut pool = NodePool::reserve(POOL_RESERVE);
        let root = pool.make_node(None, board, None);
        let mut game = Self {
            pool,
            root,
            current: root,
            result: GameResult::Undefined,
            headers: IndexMap::new(),
            tree_changed: false,
            eco: None,
        };
        game.seed_headers();
        game
    }

    fn seed_headers(&mut self) {
        self.headers.clear();
        for tag in ["Event", "Site", "Date", "Round", "White", "Black"] {
            self.headers.insert(tag.to_string(), String::new());
        }
        self.headers.insert("Result".to_string(), "*".to_string());
    }

    // ---- nodes and navigation ---------------------------------------

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    pub fn current_id(&self) -> NodeId {
        self.current
    }

    pub fn node(&self, id: NodeId) -> &GameNode {
        self.pool.node(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut GameNode {
        self.pool.node_mut(id)
    }

    pub fn current_node(&self) -> &GameNode {
        self.pool.node(self.current)
    }

    pub fn current_board(&self) -> &Board {
        self.pool.node(self.current).board()
    }

    /// Point the cursor somewhere else. The id is trusted to belong to
    /// this game's tree.
    pub fn set_current(&mut self, id: NodeId) {
        self.current = id;
    }

    pub fn go_to_root(&mut self) {
        self.current = self.root;
    }

    pub fn go_to_parent(&mut self) {
        if let Some(p) = self.pool.node(self.current).parent {
            self.current = p;
        }
    }

    pub fn go_to_child(&mut self, idx: usize) {
        let children = self.pool.node(self.current).children();
        if let Some(&c) = children.get(idx) {
            self.current = c;
        }
    }

    pub fn go_to_mainline_child(&mut self) {
        self.go_to_child(0);
    }

    /// Walk the mainline from the root to its last node.
    pub fn go_to_end(&mut self) {
        self.current = self.end_node();
    }

    /// Walk mainline children from the cursor down to a leaf.
    pub fn go_to_leaf(&mut self) {
        while !self.pool.node(self.current).is_leaf() {
            self.go_to_mainline_child();
        }
    }

    /// Last node of the mainline.
    pub fn end_node(&self) -> NodeId {
        let mut id = self.root;
        while let Some(&c) = self.pool.node(id).children.first() {
            id = c;
        }
        id
    }

    /// Mainline length in half-moves.
    pub fn count_halfmoves(&self) -> usize {
        let mut count = 0;
        let mut id = self.root;
        while let Some(&c) = self.pool.node(id).children.first() {
            id = c;
            count += 1;
        }
        count
    }

    /// Find the node carrying a given process-unique id.
    pub fn find_node_by_id(&self, uid: u32) -> Result<NodeId> {
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = self.pool.node(id);
            if node.uid == uid {
                return Ok(id);
            }
            stack.extend(node.children.iter().copied());
        }
        Err(Error::IllegalOperation(format!("node {uid} doesn't exist")))
    }

    // ---- growing the tree -------------------------------------------

    /// Apply a move at the cursor. When an identical child already
    /// exists the cursor just moves there, otherwise a new variation
    /// is appended.
    pub fn apply_move(&mut self, m: Move) {
        let existing = self
            .pool
            .node(self.current)
            .children
            .iter()
            .copied()
            .find(|&c| self.pool.node(c).mv == Some(m));
        match existing {
            Some(c) => self.current = c,
            None => {
                let mut board = self.pool.node(self.current).board.clone();
                board.apply(&m);
                self.current = self.append_child(self.current, m, board);
                self.tree_changed = true;
            }
        }
    }

    /// Attach a prepared child node; used by the PGN reader, which has
    /// already produced the resulting board.
    pub(crate) fn append_child(&mut self, parent: NodeId, m: Move, board: Board) -> NodeId {
        let child = self.pool.make_node(Some(m), board, Some(parent));
        self.pool.node_mut(parent).children.push(child);
        child
    }

    // ---- tree edits -------------------------------------------------

    /// Swap a node with the sibling above it in display order.
    pub fn move_up(&mut self, id: NodeId) {
        if let Some(parent) = self.pool.node(id).parent {
            let children = &mut self.pool.node_mut(parent).children;
            if let Some(i) = children.iter().position(|&c| c == id) {
                if i > 0 {
                    children.swap(i, i - 1);
                }
            }
            self.tree_changed = true;
        }
    }

    /// Swap a node with the sibling below it in display order.
    pub fn move_down(&mut self, id: NodeId) {
        if let Some(parent) = self.pool.node(id).parent {
            let children = &mut self.pool.node_mut(parent).children;
            if let Some(i) = children.iter().position(|&c| c == id) {
                if i + 1 < children.len() {
                    children.swap(i, i + 1);
                }
            }
            self.tree_changed = true;
        }
    }

    /// Remove the whole variation the node sits on: climb to the first
    /// ancestor that is one of several siblings, prune that subtree,
    /// and leave the cursor on its parent.
    pub fn delete_variation(&mut self, id: NodeId) {
        let mut var_root = id;
        loop {
            match self.pool.node(var_root).parent {
                Some(p) if self.pool.node(p).children.len() == 1 => var_root = p,
                _ => break,
            }
        }
        if let Some(parent) = self.pool.node(var_root).parent {
            let children = &mut self.pool.node_mut(parent).children;
            if let Some(i) = children.iter().position(|&c| c == var_root) {
                children.remove(i);
                self.pool.release_subtree(var_root);
                self.current = parent;
                self.tree_changed = true;
            }
        }
    }

    /// Remove every descendant of the node; the cursor lands on it.
    pub fn delete_below(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.pool.node_mut(id).children);
        for c in children {
            self.pool.release_subtree(c);
        }
        self.current = id;
        self.tree_changed = true;
    }

    /// Strip comments from every node of the tree.
    pub fn remove_all_comments(&mut self) {
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = self.pool.node_mut(id);
            node.comment.clear();
            stack.extend(node.children.iter().copied());
        }
        self.tree_changed = true;
    }

    /// Keep only the mainline child of every node along the mainline.
    pub fn remove_all_variations(&mut self) {
        let mut id = self.root;
        loop {
            let children = std::mem::take(&mut self.pool.node_mut(id).children);
            let Some((&main, rest)) = children.split_first() else { break };
            for &side in rest {
                self.pool.release_subtree(side);
            }
            self.pool.node_mut(id).children.push(main);
            id = main;
        }
        self.current = self.root;
        self.tree_changed = true;
    }

    /// Whether any mainline position carries the given position hash.
    pub fn matches_position(&mut self, pos_hash: u64) -> bool {
        let mut id = self.root;
        loop {
            if self.pool.node_mut(id).board.pos_hash() == pos_hash {
                return true;
            }
            match self.pool.node(id).children.first() {
                Some(&c) => id = c,
                None => return false,
            }
        }
    }

    /// Throw the tree away and restart from the supplied position.
    pub fn reset_with_board(&mut self, board: Board) {
        self.pool.release_subtree(self.root);
        self.root = self.pool.make_node(None, board, None);
        self.current = self.root;
        self.result = GameResult::Undefined;
        self.seed_headers();
        self.eco = None;
        self.tree_changed = true;
    }

    // ---- result, headers, eco ---------------------------------------

    pub fn result(&self) -> GameResult {
        self.result
    }

    pub fn set_result(&mut self, result: GameResult) {
        self.result = result;
    }

    pub fn header(&self, tag: &str) -> Option<&str> {
        self.headers.get(tag).map(String::as_str)
    }

    pub fn set_header(&mut self, tag: &str, value: &str) {
        self.headers.insert(tag.to_string(), value.to_string());
    }

    /// Header tags in insertion order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.headers.keys().map(String::as_str)
    }

    pub fn headers(&self) -> &IndexMap<String, String> {
        &self.headers
    }

    /// Drop all headers and re-seed the seven-tag roster.
    pub fn clear_headers(&mut self) {
        self.seed_headers();
    }

    pub fn tree_changed(&self) -> bool {
        self.tree_changed
    }

    pub fn set_tree_changed(&mut self, status: bool) {
        self.tree_changed = status;
    }

    pub fn eco_info(&self) -> Option<&EcoInfo> {
        self.eco.as_ref()
    }

    pub fn was_eco_classified(&self) -> bool {
        self.eco.is_some()
    }

    /// Store the classification an external ECO service produced and
    /// mirror its code into the headers.
    pub fn set_eco_info(&mut self, info: EcoInfo) {
        self.set_header("ECO", &info.code);
        self.eco = Some(info);
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::square::*;

    #[test]
    fn apply_move_reuses_matching_children() {
        let mut g = Game::new();
        g.apply_move(Move::new(E2, E4));
        let first = g.current_id();
        g.go_to_root();
        g.apply_move(Move::new(E2, E4));
        assert_eq!(g.current_id(), first);
        assert_eq!(g.node(g.root_id()).children().len(), 1);
        g.go_to_root();
        g.apply_move(Move::new(D2, D4));
        assert_eq!(g.node(g.root_id()).children().len(), 2);
    }

    #[test]
    fn variation_reorder() {
        let mut g = Game::new();
        g.apply_move(Move::new(E2, E4));
        g.go_to_root();
        g.apply_move(Move::new(D2, D4));
        let d4 = g.current_id();
        g.go_to_root();
        g.apply_move(Move::new(C2, C4));
        let c4 = g.current_id();

        g.move_up(c4);
        let children = g.node(g.root_id()).children().to_vec();
        assert_eq!(children[1], c4);
        assert_eq!(children[2], d4);
        g.move_down(c4);
        let children = g.node(g.root_id()).children().to_vec();
        assert_eq!(children[2], c4);
        // moving the mainline up is a no-op
        g.move_up(children[0]);
        assert_eq!(g.node(g.root_id()).children()[0], children[0]);
    }

    #[test]
    fn delete_variation_prunes_to_the_branch_point() {
        let mut g = Game::new();
        g.apply_move(Move::new(E2, E4));
        let e4 = g.current_id();
        g.apply_move(Move::new(E7, E5));
        g.set_current(e4);
        g.apply_move(Move::new(C7, C5));
        g.apply_move(Move::new(G1, F3));
        let deep = g.current_id();

        // deleting from deep inside the sideline removes c5 and below
        g.delete_variation(deep);
        assert_eq!(g.current_id(), e4);
        assert_eq!(g.node(e4).children().len(), 1);
    }

    #[test]
    fn delete_variation_is_noop_on_pure_mainline() {
        let mut g = Game::new();
        g.apply_move(Move::new(E2, E4));
        g.apply_move(Move::new(E7, E5));
        let leaf = g.current_id();
        g.delete_variation(leaf);
        assert_eq!(g.count_halfmoves(), 2);
    }

    #[test]
    fn delete_below_and_pool_reuse() {
        let mut g = Game::new();
        g.apply_move(Move::new(E2, E4));
        let e4 = g.current_id();
        g.apply_move(Move::new(E7, E5));
        g.apply_move(Move::new(G1, F3));
        let free_before = g.pool.free_count();
        g.delete_below(e4);
        assert_eq!(g.current_id(), e4);
        assert!(g.node(e4).is_leaf());
        assert_eq!(g.pool.free_count(), free_before + 2);
    }

    #[test]
    fn remove_all_variations_keeps_the_mainline() {
        let mut g = Game::new();
        g.apply_move(Move::new(E2, E4));
        g.apply_move(Move::new(E7, E5));
        g.go_to_root();
        g.apply_move(Move::new(D2, D4));
        g.remove_all_variations();
        assert_eq!(g.node(g.root_id()).children().len(), 1);
        assert_eq!(g.count_halfmoves(), 2);
        assert_eq!(g.current_id(), g.root_id());
    }

    #[test]
    fn comments_and_nags() {
        let mut g = Game::new();
        g.apply_move(Move::new(E2, E4));
        let id = g.current_id();
        g.node_mut(id).set_comment("the classic");
        g.node_mut(id).add_nag(1);
        g.node_mut(id).add_nag(1);
        g.node_mut(id).add_nag(14);
        assert_eq!(g.node(id).nags().len(), 2);
        g.remove_all_comments();
        assert_eq!(g.node(id).comment(), "");
    }

    #[test]
    fn headers_keep_insertion_order() {
        let mut g = Game::new();
        g.set_header("WhiteElo", "2750");
        g.set_header("Event", "Test Open");
        let tags: Vec<&str> = g.tags().collect();
        assert_eq!(
            tags,
            vec!["Event", "Site", "Date", "Round", "White", "Black", "Result", "WhiteElo"]
        );
        assert_eq!(g.header("Event"), Some("Test Open"));
        g.clear_headers();
        assert_eq!(g.header("Result"), Some("*"));
        assert_eq!(g.header("WhiteElo"), None);
    }

    #[test]
    fn matches_position_walks_the_mainline() {
        let mut g = Game::new();
        g.apply_move(Move::new(E2, E4));
        g.apply_move(Move::new(E7, E5));
        let mut probe = Board::startpos();
        probe.apply(&Move::new(E2, E4));
        let hash = probe.pos_hash();
        assert!(g.matches_position(hash));
        assert!(!g.matches_position(hash ^ 1));
    }

    #[test]
    fn find_node_by_id_sees_sidelines() {
        let mut g = Game::new();
        g.apply_move(Move::new(E2, E4));
        g.go_to_root();
        g.apply_move(Move::new(D2, D4));
        let uid = g.current_node().id();
        let found = g.find_node_by_id(uid).unwrap();
        assert_eq!(found, g.current_id());
        assert!(g.find_node_by_id(u32::MAX).is_err());
    }

    #[test]
    fn reset_with_board_restarts_the_tree() {
        let mut g = Game::new();
        g.apply_move(Move::new(E2, E4));
        g.set_header("White", "someone");
        let board = Board::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        g.reset_with_board(board.clone());
        assert_eq!(g.count_halfmoves(), 0);
        assert_eq!(g.current_board(), &board);
        assert_eq!(g.header("White"), Some(""));
        assert_eq!(g.result(), GameResult::Undefined);
        assert!(g.tree_changed());
    }
}
