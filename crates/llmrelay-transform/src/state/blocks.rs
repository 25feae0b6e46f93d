/// Dialect-neutral address of a content block.
///
/// Non-negative indices are ordinary blocks; [`BlockIndex::REASONING`] is the
/// single reserved reasoning slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockIndex(i32);

impl BlockIndex {
    pub const REASONING: BlockIndex = BlockIndex(-1);
    pub const FIRST: BlockIndex = BlockIndex(0);

    pub fn get(self) -> i32 {
        self.0
    }

    pub fn is_reasoning(self) -> bool {
        self == Self::REASONING
    }

    fn slot(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }

    fn from_slot(slot: usize) -> Self {
        BlockIndex(i32::try_from(slot).unwrap_or(i32::MAX))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Text,
    Thinking,
    ToolUse,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentBlock {
    kind: BlockKind,
    index: BlockIndex,
    started: bool,
    content: String,
    tool_id: Option<String>,
    tool_name: Option<String>,
    tool_input: Option<String>,
    signature: Option<String>,
}

impl ContentBlock {
    pub fn new(kind: BlockKind, index: BlockIndex) -> Self {
        Self {
            kind,
            index,
            started: true,
            content: String::new(),
            tool_id: None,
            tool_name: None,
            tool_input: None,
            signature: None,
        }
    }

    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    pub fn index(&self) -> BlockIndex {
        self.index
    }

    pub fn started(&self) -> bool {
        self.started
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn tool_id(&self) -> Option<&str> {
        self.tool_id.as_deref()
    }

    pub fn tool_name(&self) -> Option<&str> {
        self.tool_name.as_deref()
    }

    pub fn tool_input(&self) -> Option<&str> {
        self.tool_input.as_deref()
    }

    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    /// Deltas only ever extend the content of a started block.
    pub fn append(&mut self, delta: &str) {
        self.started = true;
        self.content.push_str(delta);
    }

    pub(crate) fn set_signature(&mut self, signature: String) {
        self.signature = Some(signature);
    }

    pub(crate) fn set_tool(&mut self, id: String, name: String, input: String) {
        self.tool_id = Some(id);
        self.tool_name = Some(name);
        self.content.push_str(&input);
        self.tool_input = Some(input);
    }

    /// Tool arguments are atomic; a repeated call id replaces them.
    pub(crate) fn replace_tool_input(&mut self, input: String) {
        self.content.clone_from(&input);
        self.tool_input = Some(input);
    }
}

/// Sparse index -> block table with a reserved reasoning slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockTable {
    reasoning: Option<ContentBlock>,
    slots: Vec<Option<ContentBlock>>,
}

impl BlockTable {
    pub fn get(&self, index: BlockIndex) -> Option<&ContentBlock> {
        match index.slot() {
            Some(slot) => self.slots.get(slot).and_then(Option::as_ref),
            None if index.is_reasoning() => self.reasoning.as_ref(),
            None => None,
        }
    }

    pub fn get_mut(&mut self, index: BlockIndex) -> Option<&mut ContentBlock> {
        match index.slot() {
            Some(slot) => self.slots.get_mut(slot).and_then(Option::as_mut),
            None if index.is_reasoning() => self.reasoning.as_mut(),
            None => None,
        }
    }

    /// Lowest non-negative index without a block.
    pub fn next_free(&self) -> BlockIndex {
        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .unwrap_or(self.slots.len());
        BlockIndex::from_slot(slot)
    }

    /// Inserts at the block's own index. An occupied index keeps its block,
    /// since a block's kind never changes after creation.
    pub fn insert(&mut self, block: ContentBlock) -> bool {
        match block.index.slot() {
            Some(slot) => {
                if slot >= self.slots.len() {
                    self.slots.resize_with(slot + 1, || None);
                }
                if self.slots[slot].is_some() {
                    return false;
                }
                self.slots[slot] = Some(block);
                true
            }
            None if block.index.is_reasoning() && self.reasoning.is_none() => {
                self.reasoning = Some(block);
                true
            }
            None => false,
        }
    }

    pub(crate) fn reasoning_mut(&mut self) -> &mut ContentBlock {
        self.reasoning
            .get_or_insert_with(|| ContentBlock::new(BlockKind::Thinking, BlockIndex::REASONING))
    }

    /// Reasoning first, then ordinary blocks in index order.
    pub fn iter(&self) -> impl Iterator<Item = &ContentBlock> {
        self.reasoning
            .iter()
            .chain(self.slots.iter().filter_map(Option::as_ref))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.reasoning.is_none() && self.slots.iter().all(Option::is_none)
    }
}
