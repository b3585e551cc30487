//! The closed set of node kinds the transducer knows how to render.

/// Emphasis flavours, each mapped to one inline HTML element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emphasis {
    Italic,
    Bold,
    UiControl,
    Abbreviation,
}

/// Node kind, derived from the element name.
///
/// Every element the renderer vocabulary covers maps to exactly one variant;
/// everything else is [`NodeKind::Unknown`] and goes to the audit sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Transparent grouping element; only its children render.
    Container,
    Title,
    ShortDesc,
    Paragraph,
    Note,
    Valid,
    NotValid,
    OrderedList,
    UnorderedList,
    ListItem,
    StepsOrdered,
    StepsUnordered,
    StepGroup,
    Step,
    Substeps,
    Table,
    SafetyMessage,
    Prereq,
    Illustration,
    IllustrationTable,
    Graphic,
    CalloutList,
    CalloutItem,
    CalloutRef,
    Xref,
    Emphasis(Emphasis),
    InlineGraphic,
    Unknown,
}

impl NodeKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "topic" | "task" | "concept" | "reference" | "section" | "body" | "conbody"
            | "taskbody" | "group" | "procbody" | "procedure-section" | "procedure-group"
            | "substep" | "poscol" | "illustrationtext" | "illustrationcol" => Self::Container,
            "title" => Self::Title,
            "shortdesc" => Self::ShortDesc,
            "p" => Self::Paragraph,
            "note" => Self::Note,
            "valid" => Self::Valid,
            "notvalid" => Self::NotValid,
            "ol" => Self::OrderedList,
            "ul" => Self::UnorderedList,
            "li" => Self::ListItem,
            "steps-ordered" => Self::StepsOrdered,
            "steps-unordered" => Self::StepsUnordered,
            "step-group" => Self::StepGroup,
            "step" => Self::Step,
            "substeps" => Self::Substeps,
            "table" => Self::Table,
            "safetymessage" => Self::SafetyMessage,
            "prereq" => Self::Prereq,
            "illustration" | "pdfbody" => Self::Illustration,
            "illustrationtable" => Self::IllustrationTable,
            "graphic" => Self::Graphic,
            "poslist" => Self::CalloutList,
            "pli" => Self::CalloutItem,
            "pos" => Self::CalloutRef,
            "xref" => Self::Xref,
            "i" => Self::Emphasis(Emphasis::Italic),
            "b" => Self::Emphasis(Emphasis::Bold),
            "uicontrol" => Self::Emphasis(Emphasis::UiControl),
            "abbrev" => Self::Emphasis(Emphasis::Abbreviation),
            "inline-graphic" => Self::InlineGraphic,
            _ => Self::Unknown,
        }
    }

    /// Kinds that produce phrasing content.
    pub fn is_inline(self) -> bool {
        matches!(
            self,
            Self::CalloutRef | Self::Xref | Self::Emphasis(_) | Self::InlineGraphic
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_vocabulary() {
        assert_eq!(NodeKind::from_tag("steps-ordered"), NodeKind::StepsOrdered);
        assert_eq!(NodeKind::from_tag("pli"), NodeKind::CalloutItem);
        assert_eq!(NodeKind::from_tag("pdfbody"), NodeKind::Illustration);
        assert_eq!(NodeKind::from_tag("procbody"), NodeKind::Container);
        assert_eq!(
            NodeKind::from_tag("uicontrol"),
            NodeKind::Emphasis(Emphasis::UiControl)
        );
    }

    #[test]
    fn unlisted_tags_are_unknown() {
        assert_eq!(NodeKind::from_tag("fig"), NodeKind::Unknown);
        assert_eq!(NodeKind::from_tag("P"), NodeKind::Unknown);
        assert_eq!(NodeKind::from_tag("tgroup"), NodeKind::Unknown);
    }

    #[test]
    fn inline_kinds() {
        assert!(NodeKind::from_tag("xref").is_inline());
        assert!(NodeKind::from_tag("b").is_inline());
        assert!(!NodeKind::from_tag("p").is_inline());
        assert!(!NodeKind::Unknown.is_inline());
    }
}
