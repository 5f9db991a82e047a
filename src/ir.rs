/// Which edge of the source row a connector leaves from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkSide {
    Left,
    #[default]
    Right,
}

impl LinkSide {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    /// Horizontal direction a connector leaves the row in.
    pub fn sign(self) -> f64 {
        match self {
            Self::Left => -1.0,
            Self::Right => 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub target: String,
    pub side: LinkSide,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    pub name: Option<String>,
    pub ty: Option<String>,
    pub desc: Option<String>,
    pub offset: Option<String>,
    pub size: Option<String>,
    pub link: Option<Link>,
}

impl Row {
    /// Text of the content cell: `"<type> <name>"` (or whichever exists)
    /// followed by the description.
    pub fn content_text(&self) -> Option<String> {
        let mut parts: Vec<String> = Vec::new();
        match (non_empty(&self.name), non_empty(&self.ty)) {
            (Some(name), Some(ty)) => parts.push(format!("{ty} {name}")),
            (Some(name), None) => parts.push(name.to_string()),
            (None, Some(ty)) => parts.push(ty.to_string()),
            (None, None) => {}
        }
        if let Some(desc) = non_empty(&self.desc) {
            parts.push(desc.to_string());
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }

    pub fn has_content(&self) -> bool {
        non_empty(&self.name).is_some()
            || non_empty(&self.ty).is_some()
            || non_empty(&self.desc).is_some()
            || self.link.is_some()
    }

    /// Rows with nothing but (optionally) offset/size labels.
    pub fn is_spacer(&self) -> bool {
        !self.has_content()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HeaderKind {
    Offset,
    Content,
    Size,
}

impl HeaderKind {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "offset" => Some(Self::Offset),
            "content" => Some(Self::Content),
            "size" => Some(Self::Size),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Offset => "offset",
            Self::Content => "content",
            Self::Size => "size",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnHeader {
    pub kind: HeaderKind,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    pub id: Option<String>,
    pub title: String,
    pub rows: Vec<Row>,
    pub scrollable: bool,
    pub headers: Vec<ColumnHeader>,
}

impl Block {
    pub fn new(id: Option<&str>, title: &str) -> Self {
        Self {
            id: id.map(str::to_string),
            title: title.to_string(),
            ..Default::default()
        }
    }

    /// Outbound links in row order, paired with the row index.
    pub fn links(&self) -> impl Iterator<Item = (usize, &Link)> {
        self.rows
            .iter()
            .enumerate()
            .filter_map(|(idx, row)| row.link.as_ref().map(|link| (idx, link)))
    }

    pub fn has_offsets(&self) -> bool {
        self.rows.iter().any(|row| non_empty(&row.offset).is_some())
    }

    pub fn has_sizes(&self) -> bool {
        self.rows.iter().any(|row| non_empty(&row.size).is_some())
    }

    pub fn has_content(&self) -> bool {
        self.rows.iter().any(Row::has_content)
    }

    /// Whether the column of `kind` carries data in at least one row.
    pub fn has_column(&self, kind: HeaderKind) -> bool {
        match kind {
            HeaderKind::Offset => self.has_offsets(),
            HeaderKind::Content => self.has_content(),
            HeaderKind::Size => self.has_sizes(),
        }
    }

    pub fn header_for(&self, kind: HeaderKind) -> Option<&ColumnHeader> {
        self.headers.iter().find(|header| header.kind == kind)
    }

    /// Headers that will actually be shown: only those whose column has data.
    pub fn visible_headers(&self) -> Vec<&ColumnHeader> {
        self.headers
            .iter()
            .filter(|header| self.has_column(header.kind))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockGraph {
    pub blocks: Vec<Block>,
}

impl BlockGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, block: Block) -> usize {
        self.blocks.push(block);
        self.blocks.len() - 1
    }

    /// Index of the first block declared with `id`.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.blocks
            .iter()
            .position(|block| block.id.as_deref() == Some(id))
    }

    /// Human readable name for a block: its id, or `#<index>` when anonymous.
    pub fn label(&self, index: usize) -> String {
        match self.blocks.get(index).and_then(|block| block.id.as_deref()) {
            Some(id) => id.to_string(),
            None => format!("#{index}"),
        }
    }

    pub fn link_count(&self) -> usize {
        self.blocks.iter().map(|block| block.links().count()).sum()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: Option<&str>, ty: Option<&str>, desc: Option<&str>) -> Row {
        Row {
            name: name.map(str::to_string),
            ty: ty.map(str::to_string),
            desc: desc.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn content_text_puts_type_before_name() {
        assert_eq!(
            row(Some("len"), Some("u32"), Some("payload length")).content_text(),
            Some("u32 len payload length".to_string())
        );
        assert_eq!(row(Some("len"), None, None).content_text(), Some("len".to_string()));
        assert_eq!(row(None, Some("u8"), None).content_text(), Some("u8".to_string()));
        assert_eq!(row(None, None, None).content_text(), None);
    }

    #[test]
    fn rows_without_content_are_spacers() {
        let mut spacer = Row {
            offset: Some("0x10".to_string()),
            ..Default::default()
        };
        assert!(spacer.is_spacer());
        spacer.link = Some(Link {
            target: "next".to_string(),
            side: LinkSide::Right,
        });
        assert!(!spacer.is_spacer());
    }

    #[test]
    fn visible_headers_follow_column_data() {
        let mut block = Block::new(Some("hdr"), "Header");
        block.headers = vec![
            ColumnHeader {
                kind: HeaderKind::Offset,
                text: "Offset".to_string(),
            },
            ColumnHeader {
                kind: HeaderKind::Content,
                text: "Field".to_string(),
            },
            ColumnHeader {
                kind: HeaderKind::Size,
                text: "Size".to_string(),
            },
        ];
        block.rows.push(Row {
            name: Some("magic".to_string()),
            size: Some("4".to_string()),
            ..Default::default()
        });
        let kinds: Vec<HeaderKind> = block.visible_headers().iter().map(|h| h.kind).collect();
        assert_eq!(kinds, vec![HeaderKind::Content, HeaderKind::Size]);
    }

    #[test]
    fn position_prefers_first_declaration() {
        let mut graph = BlockGraph::new();
        graph.push(Block::new(Some("a"), "First"));
        graph.push(Block::new(None, "Anonymous"));
        graph.push(Block::new(Some("a"), "Second"));
        assert_eq!(graph.position("a"), Some(0));
        assert_eq!(graph.position("missing"), None);
        assert_eq!(graph.label(1), "#1");
    }

    #[test]
    fn link_side_tokens() {
        assert_eq!(LinkSide::from_token("Left"), Some(LinkSide::Left));
        assert_eq!(LinkSide::from_token("right"), Some(LinkSide::Right));
        assert_eq!(LinkSide::from_token("up"), None);
        assert_eq!(LinkSide::default(), LinkSide::Right);
    }
}
