//! Generational Value Arena
//!
//! Every value a bucket stores lives in that bucket's current [`Arena`]. An
//! arena is a bump vector of nodes: values are copied *into* it, read through
//! index handles ([`Term`]), and never freed one at a time. Replacing the arena
//! is the only way memory comes back, which is what the collector does.
//!
//! ## Layout
//!
//! ```text
//!   Value::Tuple([Int(1), List([a, b])])
//!
//!   nodes: [ Int(1) | Binary(a) | Binary(b) | Nil | Cons(b, Nil) | Cons(a, #4) | Tuple(#0, #5) ]
//!            #0       #1          #2          #3    #4             #5           #6
//! ```
//!
//! Lists are cons cells so that pushing onto the front of a stored list
//! allocates one cell and popping from the front just moves to the tail.
//!
//! ## Generations
//!
//! Each arena carries a generation number and every [`Term`] remembers the
//! generation it was allocated in. A term is only meaningful against the arena
//! with the same generation; [`Arena::copy_from`] is how a term crosses over.

use crate::value::Value;
use bytes::Bytes;

/// Bytes charged per node slot by the size estimate.
const WORD_SIZE: u64 = 8;

/// A handle to a node inside one specific arena generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Term {
    generation: u64,
    index: usize,
}

impl Term {
    /// The arena generation this term belongs to.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug)]
pub(crate) enum Node {
    Int(i64),
    Float(f64),
    Atom(Box<str>),
    Binary(Bytes),
    Nil,
    Cons { head: Term, tail: Term },
    Tuple(Box<[Term]>),
}

/// A numeric node, read out for arithmetic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Number {
    Int(i64),
    Float(f64),
}

/// A bulk allocation context for stored values.
#[derive(Debug)]
pub struct Arena {
    generation: u64,
    nodes: Vec<Node>,
    binary_bytes: u64,
}

impl Arena {
    /// Creates an empty arena for the given generation.
    pub fn new(generation: u64) -> Self {
        Self {
            generation,
            nodes: Vec::new(),
            binary_bytes: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of nodes ever allocated in this arena, live or not.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Approximate memory held by this arena.
    pub fn allocated_bytes(&self) -> u64 {
        self.nodes.len() as u64 * WORD_SIZE + self.binary_bytes
    }

    fn alloc(&mut self, node: Node) -> Term {
        if let Node::Binary(data) = &node {
            self.binary_bytes += data.len() as u64;
        }
        let index = self.nodes.len();
        self.nodes.push(node);
        Term {
            generation: self.generation,
            index,
        }
    }

    pub(crate) fn node(&self, term: Term) -> &Node {
        debug_assert_eq!(
            term.generation, self.generation,
            "term used against the wrong arena generation"
        );
        &self.nodes[term.index]
    }

    pub(crate) fn int(&mut self, n: i64) -> Term {
        self.alloc(Node::Int(n))
    }

    pub(crate) fn float(&mut self, n: f64) -> Term {
        self.alloc(Node::Float(n))
    }

    pub(crate) fn nil(&mut self) -> Term {
        self.alloc(Node::Nil)
    }

    pub(crate) fn cons(&mut self, head: Term, tail: Term) -> Term {
        self.alloc(Node::Cons { head, tail })
    }

    pub(crate) fn tuple(&mut self, fields: Vec<Term>) -> Term {
        self.alloc(Node::Tuple(fields.into_boxed_slice()))
    }

    pub(crate) fn tuple_fields(&self, term: Term) -> Option<&[Term]> {
        match self.node(term) {
            Node::Tuple(fields) => Some(fields),
            _ => None,
        }
    }

    pub(crate) fn number(&self, term: Term) -> Option<Number> {
        match self.node(term) {
            Node::Int(n) => Some(Number::Int(*n)),
            Node::Float(n) => Some(Number::Float(*n)),
            _ => None,
        }
    }

    pub(crate) fn is_list(&self, term: Term) -> bool {
        matches!(self.node(term), Node::Nil | Node::Cons { .. })
    }

    /// Splits a non-empty list into head and tail.
    pub(crate) fn uncons(&self, term: Term) -> Option<(Term, Term)> {
        match self.node(term) {
            Node::Cons { head, tail } => Some((*head, *tail)),
            _ => None,
        }
    }

    pub(crate) fn list_len(&self, mut term: Term) -> usize {
        let mut len = 0;
        while let Some((_, tail)) = self.uncons(term) {
            len += 1;
            term = tail;
        }
        len
    }

    /// Copies a host value into this arena.
    pub fn copy_in(&mut self, value: &Value) -> Term {
        match value {
            Value::Int(n) => self.int(*n),
            Value::Float(n) => self.float(*n),
            Value::Atom(name) => self.alloc(Node::Atom(name.as_str().into())),
            Value::Binary(data) => self.alloc(Node::Binary(data.clone())),
            Value::List(items) => {
                let mut list = self.nil();
                for item in items.iter().rev() {
                    let head = self.copy_in(item);
                    list = self.cons(head, list);
                }
                list
            }
            Value::Tuple(fields) => {
                let fields = fields.iter().map(|f| self.copy_in(f)).collect();
                self.tuple(fields)
            }
        }
    }

    /// Copies a term out of this arena into an owned host value.
    pub fn copy_out(&self, term: Term) -> Value {
        match self.node(term) {
            Node::Int(n) => Value::Int(*n),
            Node::Float(n) => Value::Float(*n),
            Node::Atom(name) => Value::Atom(name.to_string()),
            Node::Binary(data) => Value::Binary(data.clone()),
            Node::Nil | Node::Cons { .. } => {
                let mut items = Vec::new();
                let mut cursor = term;
                while let Some((head, tail)) = self.uncons(cursor) {
                    items.push(self.copy_out(head));
                    cursor = tail;
                }
                Value::List(items)
            }
            Node::Tuple(fields) => Value::Tuple(fields.iter().map(|f| self.copy_out(*f)).collect()),
        }
    }

    /// Copies a term living in `src` into this arena.
    ///
    /// The copy is independent of `src`: dropping `src` afterwards leaves the
    /// returned term intact. Binary payloads are shared by reference count.
    pub fn copy_from(&mut self, src: &Arena, term: Term) -> Term {
        match src.node(term) {
            Node::Int(n) => self.int(*n),
            Node::Float(n) => self.float(*n),
            Node::Atom(name) => self.alloc(Node::Atom(name.clone())),
            Node::Binary(data) => self.alloc(Node::Binary(data.clone())),
            Node::Nil | Node::Cons { .. } => {
                let mut heads = Vec::new();
                let mut cursor = term;
                while let Some((head, tail)) = src.uncons(cursor) {
                    heads.push(head);
                    cursor = tail;
                }
                let mut list = self.nil();
                for head in heads.into_iter().rev() {
                    let head = self.copy_from(src, head);
                    list = self.cons(head, list);
                }
                list
            }
            Node::Tuple(fields) => {
                let fields = fields.iter().map(|f| self.copy_from(src, *f)).collect();
                self.tuple(fields)
            }
        }
    }

    /// Estimates the bytes a term occupies, counting shared subterms each time
    /// they are reached.
    pub fn estimate_size(&self, term: Term) -> u64 {
        match self.node(term) {
            Node::Int(_) | Node::Float(_) | Node::Atom(_) | Node::Nil => WORD_SIZE,
            Node::Binary(data) => 2 * WORD_SIZE + data.len() as u64,
            Node::Cons { .. } => {
                let mut size = 0;
                let mut cursor = term;
                while let Some((head, tail)) = self.uncons(cursor) {
                    size += 2 * WORD_SIZE + self.estimate_size(head);
                    cursor = tail;
                }
                size + WORD_SIZE
            }
            Node::Tuple(fields) => {
                (1 + fields.len() as u64) * WORD_SIZE
                    + fields.iter().map(|f| self.estimate_size(*f)).sum::<u64>()
            }
        }
    }
}
