//! Shared test fixtures: a byte-accurate fake target process.
//!
//! `FakeImage` implements [`MemoryImage`] over an in-memory address space
//! holding real node blocks laid out as `{left, right, parent, color,
//! key, value}` with 8-byte pointers, plus a map header of
//! `{begin_node, end_node_left, size}`. Navigation reads actual bytes, so
//! corruption tests can poke pointers and drop pages exactly like a sick
//! target would present them.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::sync::Once;

use mapscope_core::{
    Address, ByteOrder, LayoutResolver, MapscopeError, MapscopeResult, MemoryImage, NodeLayout,
    TypeRef, ValueId,
};

pub const PTR_WIDTH: u64 = 8;

/// Byte offset of the key/value payload within a node block
pub const NODE_PAYLOAD_OFFSET: u64 = 32;

/// Total byte size of a node block
pub const NODE_BYTE_SIZE: u64 = 48;

/// Address of the map variable: `{begin_node, end_node.__left_, size}`
pub const MAP_ADDR: u64 = 0x1000;

/// Address of the embedded end node (its `left` is the tree root)
pub const END_NODE_ADDR: u64 = MAP_ADDR + PTR_WIDTH;

/// Address of the element-count word
pub const SIZE_ADDR: u64 = MAP_ADDR + 2 * PTR_WIDTH;

/// Address of a map-iterator variable: `{node_ptr}`
pub const ITER_ADDR: u64 = 0x800;

/// Address of the `slot`-th node block
pub fn node_addr(slot: u64) -> u64
{
    0x2000 + slot * 0x100
}

// Fake compiler-type tokens.
pub const TY_MAP: TypeRef = TypeRef(1);
pub const TY_TREE: TypeRef = TypeRef(2);
pub const TY_NODE_PTR: TypeRef = TypeRef(3);
pub const TY_NODE: TypeRef = TypeRef(4);
pub const TY_SIZE_PAIR: TypeRef = TypeRef(5);
pub const TY_SIZE_PAIR_ELEM: TypeRef = TypeRef(6);
pub const TY_SIZE_T: TypeRef = TypeRef(7);
pub const TY_PAIR: TypeRef = TypeRef(8);
pub const TY_U64: TypeRef = TypeRef(9);
pub const TY_MAP_ITER: TypeRef = TypeRef(10);
pub const TY_TREE_ITER: TypeRef = TypeRef(11);

#[derive(Debug, Clone, Copy)]
struct FakeValue
{
    addr: u64,
    ty: TypeRef,
}

/// In-memory stand-in for a stopped target process
pub struct FakeImage
{
    mem: RefCell<BTreeMap<u64, u8>>,
    values: RefCell<Vec<FakeValue>>,
    next_buffer_addr: Cell<u64>,
    /// When false, the pair expression path fails and the single-entry
    /// resolver must take the raw-memory fallback.
    pub symbolic_paths: Cell<bool>,
    /// When true, the size pair presents the pre-2017 libc++ shape: the
    /// count is an anonymous-index `__first_` member and `__value_` does
    /// not exist.
    pub legacy_size_pair: Cell<bool>,
}

impl FakeImage
{
    pub fn new() -> Self
    {
        FakeImage {
            mem: RefCell::new(BTreeMap::new()),
            values: RefCell::new(Vec::new()),
            next_buffer_addr: Cell::new(0xF000_0000),
            symbolic_paths: Cell::new(true),
            legacy_size_pair: Cell::new(false),
        }
    }

    pub fn mk_value(&self, addr: u64, ty: TypeRef) -> ValueId
    {
        let mut values = self.values.borrow_mut();
        values.push(FakeValue { addr, ty });
        ValueId(values.len() as u64 - 1)
    }

    pub fn poke_bytes(&self, addr: u64, bytes: &[u8])
    {
        let mut mem = self.mem.borrow_mut();
        for (i, byte) in bytes.iter().enumerate() {
            mem.insert(addr + i as u64, *byte);
        }
    }

    pub fn poke_word(&self, addr: u64, word: u64)
    {
        self.poke_bytes(addr, &word.to_le_bytes());
    }

    /// Drop a byte range from the address space, as if the page were unmapped
    pub fn clear_range(&self, addr: u64, len: u64)
    {
        let mut mem = self.mem.borrow_mut();
        for a in addr..addr + len {
            mem.remove(&a);
        }
    }

    pub fn word_at(&self, addr: u64) -> Option<u64>
    {
        let mem = self.mem.borrow();
        let mut bytes = [0u8; 8];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = *mem.get(&(addr + i as u64))?;
        }
        Some(u64::from_le_bytes(bytes))
    }

    fn readable(&self, addr: u64, len: u64) -> bool
    {
        let mem = self.mem.borrow();
        (addr..addr + len).all(|a| mem.contains_key(&a))
    }

    fn get(&self, value: ValueId) -> MapscopeResult<FakeValue>
    {
        self.values
            .borrow()
            .get(value.0 as usize)
            .copied()
            .ok_or(MapscopeError::InvalidHandle)
    }

    fn size_of(ty: TypeRef) -> u64
    {
        match ty {
            TY_TREE | TY_MAP => 3 * PTR_WIDTH,
            TY_NODE => NODE_BYTE_SIZE,
            TY_PAIR => 16,
            _ => 8,
        }
    }

    fn is_scalar(ty: TypeRef) -> bool
    {
        matches!(ty, TY_NODE_PTR | TY_SIZE_T | TY_U64)
    }
}

impl MemoryImage for FakeImage
{
    fn child_by_name(&self, value: ValueId, name: &str) -> MapscopeResult<ValueId>
    {
        let fv = self.get(value)?;
        match (fv.ty, name) {
            (TY_MAP, "__tree_") => Ok(self.mk_value(fv.addr, TY_TREE)),
            (TY_TREE, "__begin_node_") => Ok(self.mk_value(fv.addr, TY_NODE_PTR)),
            (TY_TREE, "__pair3_") => Ok(self.mk_value(fv.addr + 2 * PTR_WIDTH, TY_SIZE_PAIR)),
            (TY_SIZE_PAIR_ELEM, "__value_") if !self.legacy_size_pair.get() => {
                Ok(self.mk_value(fv.addr, TY_SIZE_T))
            }
            (TY_SIZE_PAIR, "__first_") if self.legacy_size_pair.get() => {
                Ok(self.mk_value(fv.addr, TY_SIZE_T))
            }
            (TY_MAP_ITER, "__i_") => Ok(self.mk_value(fv.addr, TY_TREE_ITER)),
            _ => Err(MapscopeError::FieldNotFound { name: name.to_string() }),
        }
    }

    fn child_at_index(&self, value: ValueId, index: usize) -> MapscopeResult<ValueId>
    {
        let fv = self.get(value)?;
        match (fv.ty, index) {
            (TY_SIZE_PAIR, 0) => Ok(self.mk_value(fv.addr, TY_SIZE_PAIR_ELEM)),
            (TY_PAIR, 0) => Ok(self.mk_value(fv.addr, TY_U64)),
            (TY_PAIR, 1) => Ok(self.mk_value(fv.addr + 8, TY_U64)),
            _ => Err(MapscopeError::InvalidArgument(format!(
                "no child {index} on type {:?}",
                fv.ty
            ))),
        }
    }

    fn child_at_offset(&self, value: ValueId, offset: u64, ty: TypeRef) -> MapscopeResult<ValueId>
    {
        let fv = self.get(value)?;
        let base = if fv.ty == TY_NODE_PTR {
            // Pointer values read through to the pointee.
            self.word_at(fv.addr).ok_or(MapscopeError::UnreadableMemory {
                address: Address::from(fv.addr),
            })?
        } else {
            fv.addr
        };
        Ok(self.mk_value(base.wrapping_add(offset), ty))
    }

    fn value_at_path(&self, value: ValueId, path: &str) -> MapscopeResult<ValueId>
    {
        let fv = self.get(value)?;
        if fv.ty != TY_MAP_ITER {
            return Err(MapscopeError::PathNotResolved(path.to_string()));
        }
        match path {
            ".__i_.__ptr_" => Ok(self.mk_value(fv.addr, TY_NODE_PTR)),
            ".__i_.__ptr_->__value_" if self.symbolic_paths.get() => {
                let node = self.word_at(fv.addr).ok_or(MapscopeError::UnreadableMemory {
                    address: Address::from(fv.addr),
                })?;
                if node == 0 {
                    return Err(MapscopeError::PathNotResolved(path.to_string()));
                }
                Ok(self.mk_value(node + NODE_PAYLOAD_OFFSET, TY_PAIR))
            }
            _ => Err(MapscopeError::PathNotResolved(path.to_string())),
        }
    }

    fn dereference(&self, value: ValueId) -> MapscopeResult<ValueId>
    {
        let fv = self.get(value)?;
        if fv.ty != TY_NODE_PTR {
            return Err(MapscopeError::InvalidArgument("not a pointer".to_string()));
        }
        let pointee = self.word_at(fv.addr).ok_or(MapscopeError::UnreadableMemory {
            address: Address::from(fv.addr),
        })?;
        if pointee == 0 {
            return Err(MapscopeError::UnreadableMemory { address: Address::ZERO });
        }
        Ok(self.mk_value(pointee, TY_NODE))
    }

    fn unsigned_value(&self, value: ValueId) -> u64
    {
        let Ok(fv) = self.get(value) else {
            return 0;
        };
        if Self::is_scalar(fv.ty) {
            self.word_at(fv.addr).unwrap_or(0)
        } else {
            0
        }
    }

    fn is_error(&self, value: ValueId) -> bool
    {
        let Ok(fv) = self.get(value) else {
            return true;
        };
        !self.readable(fv.addr, Self::size_of(fv.ty))
    }

    fn type_of(&self, value: ValueId) -> MapscopeResult<TypeRef>
    {
        Ok(self.get(value)?.ty)
    }

    fn read_raw(&self, addr: Address, len: usize) -> MapscopeResult<Vec<u8>>
    {
        let mem = self.mem.borrow();
        let mut bytes = Vec::with_capacity(len);
        for i in 0..len as u64 {
            match mem.get(&(addr.value() + i)) {
                Some(byte) => bytes.push(*byte),
                None => return Err(MapscopeError::UnreadableMemory { address: addr }),
            }
        }
        Ok(bytes)
    }

    fn value_from_bytes(&self, _name: &str, bytes: &[u8], ty: TypeRef) -> MapscopeResult<ValueId>
    {
        let addr = self.next_buffer_addr.get();
        self.next_buffer_addr.set(addr + (bytes.len() as u64).max(1).next_multiple_of(64));
        self.poke_bytes(addr, bytes);
        Ok(self.mk_value(addr, ty))
    }

    fn byte_order(&self) -> ByteOrder
    {
        ByteOrder::Little
    }

    fn pointer_width(&self) -> u64
    {
        PTR_WIDTH
    }
}

/// Fake type-system collaborator for the fixed `{u64, u64}` payload
pub struct FakeLayouts
{
    /// When true, `node_layout` fails (simulates an incomplete payload type)
    pub fail_node_layout: Cell<bool>,
}

impl FakeLayouts
{
    pub fn new() -> Self
    {
        FakeLayouts { fail_node_layout: Cell::new(false) }
    }
}

impl LayoutResolver for FakeLayouts
{
    fn payload_type(&self, container_ty: TypeRef) -> MapscopeResult<TypeRef>
    {
        match container_ty {
            TY_MAP | TY_TREE_ITER => Ok(TY_PAIR),
            other => Err(MapscopeError::LayoutUnresolved(format!(
                "no payload for type {other:?}"
            ))),
        }
    }

    fn node_layout(&self, payload_ty: TypeRef) -> MapscopeResult<NodeLayout>
    {
        if self.fail_node_layout.get() {
            return Err(MapscopeError::LayoutUnresolved("payload type incomplete".to_string()));
        }
        if payload_ty == TY_PAIR {
            Ok(NodeLayout {
                payload_offset: NODE_PAYLOAD_OFFSET,
                byte_size: NODE_BYTE_SIZE,
            })
        } else {
            Err(MapscopeError::LayoutUnresolved(format!("unknown payload {payload_ty:?}")))
        }
    }
}

/// Write one 48-byte node block
pub fn write_node(img: &FakeImage, addr: u64, left: u64, right: u64, parent: u64, key: u64, value: u64)
{
    let mut block = Vec::with_capacity(NODE_BYTE_SIZE as usize);
    block.extend_from_slice(&left.to_le_bytes());
    block.extend_from_slice(&right.to_le_bytes());
    block.extend_from_slice(&parent.to_le_bytes());
    block.extend_from_slice(&[0u8; 8]); // color flag + padding
    block.extend_from_slice(&key.to_le_bytes());
    block.extend_from_slice(&value.to_le_bytes());
    img.poke_bytes(addr, &block);
}

/// Write the map header: begin pointer, end node's left (the root), count
pub fn write_map_header(img: &FakeImage, begin: u64, root: u64, count: u64)
{
    img.poke_word(MAP_ADDR, begin);
    img.poke_word(END_NODE_ADDR, root);
    img.poke_word(SIZE_ADDR, count);
}

/// Build a balanced tree from sorted `keys` (value = key * 2) and return the
/// map variable
pub fn balanced_map(img: &FakeImage, keys: &[u64]) -> ValueId
{
    let mut next_slot = 0u64;
    let root = build_subtree(img, keys, END_NODE_ADDR, &mut next_slot);
    let mut begin = root;
    while begin != 0 {
        match img.word_at(begin) {
            Some(0) | None => break,
            Some(left) => begin = left,
        }
    }
    write_map_header(img, begin, root, keys.len() as u64);
    img.mk_value(MAP_ADDR, TY_MAP)
}

fn build_subtree(img: &FakeImage, keys: &[u64], parent: u64, next_slot: &mut u64) -> u64
{
    if keys.is_empty() {
        return 0;
    }
    let mid = keys.len() / 2;
    let addr = node_addr(*next_slot);
    *next_slot += 1;
    let left = build_subtree(img, &keys[..mid], addr, next_slot);
    let right = build_subtree(img, &keys[mid + 1..], addr, next_slot);
    write_node(img, addr, left, right, parent, keys[mid], keys[mid] * 2);
    addr
}

/// The three-node scenario: root 20 with leaf children 10 and 30
pub fn three_node_map(img: &FakeImage) -> ValueId
{
    balanced_map(img, &[10, 20, 30])
}

/// Build a map-iterator variable pointing at the node block at `node`
pub fn map_iterator(img: &FakeImage, node: u64) -> ValueId
{
    img.poke_word(ITER_ADDR, node);
    img.mk_value(ITER_ADDR, TY_MAP_ITER)
}

/// Key of a resolved pair value
pub fn pair_key(img: &FakeImage, pair: ValueId) -> u64
{
    img.child_at_index(pair, 0).map_or(0, |v| img.unsigned_value(v))
}

/// Mapped value of a resolved pair value
pub fn pair_value(img: &FakeImage, pair: ValueId) -> u64
{
    img.child_at_index(pair, 1).map_or(0, |v| img.unsigned_value(v))
}

static LOGGING: Once = Once::new();

/// Install the tracing subscriber once per test binary
pub fn init_test_logging()
{
    LOGGING.call_once(|| {
        let _ = mapscope_utils::init_logging();
    });
}
