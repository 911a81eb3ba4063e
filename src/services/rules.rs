use crate::cli::Category;
use crate::domain::models::{Finding, Severity};
use std::collections::HashSet;

/// Project-wide set of declared resource names, keyed `type/name`, used to
/// resolve `@type/name` references.
#[derive(Debug, Default)]
pub struct ResourceIndex {
    entries: HashSet<String>,
}

impl ResourceIndex {
    pub fn insert(&mut self, ty: &str, name: &str) {
        self.entries.insert(format!("{ty}/{name}"));
    }

    pub fn contains(&self, ty: &str, name: &str) -> bool {
        self.entries.contains(&format!("{ty}/{name}"))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One parsed file moving through the pipeline.
pub struct CheckedFile<'a> {
    pub path: &'a str,
    pub category: Category,
    pub doc: &'a roxmltree::Document<'a>,
}

/// A named, stateless check over one parsed file. The engine iterates an
/// explicit ordered list of these; adding a rule touches nothing else.
pub trait Rule {
    fn id(&self) -> &'static str;
    fn applies(&self, file: &CheckedFile) -> bool;
    fn evaluate(&self, file: &CheckedFile, index: &ResourceIndex) -> Vec<Finding>;
}

/// The builtin pipeline, in evaluation order: reference resolution first,
/// then structural conventions, then advisory style checks. The order is
/// fixed so report contents are reproducible run to run.
pub fn builtin_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(BrokenReference),
        Box::new(LayoutRoot),
        Box::new(LayoutDimensions),
        Box::new(DuplicateId),
        Box::new(ManifestStructure),
        Box::new(ColorFormat),
        Box::new(DuplicateName),
        Box::new(ContentDescription),
        Box::new(EmptyString),
        Box::new(DuplicatePermission),
        Box::new(StyleParent),
    ]
}

/// Splits a resource reference like `@string/app_name` into (type, name).
/// Declarations (`@+id/...`), framework references (`@android:`,
/// `@*android:`, package-qualified), theme references (`?...`) and the
/// `@null`/`@empty` sentinels resolve outside the project and return None.
pub(crate) fn parse_reference(value: &str) -> Option<(&str, &str)> {
    if value.starts_with("@+") {
        return None;
    }
    let rest = value.strip_prefix('@')?;
    let rest = rest.strip_prefix('*').unwrap_or(rest);
    if rest == "null" || rest == "empty" {
        return None;
    }
    let (ty, name) = rest.split_once('/')?;
    if ty.is_empty() || name.is_empty() || ty.contains(':') {
        return None;
    }
    Some((ty, name))
}

fn finding(
    rule: &'static str,
    severity: Severity,
    file: &CheckedFile,
    line: Option<u32>,
    message: String,
) -> Finding {
    Finding {
        severity,
        rule,
        path: file.path.to_string(),
        line,
        message,
    }
}

fn line_of(file: &CheckedFile, node: roxmltree::Node) -> Option<u32> {
    Some(file.doc.text_pos_at(node.range().start).row)
}

struct BrokenReference;

impl Rule for BrokenReference {
    fn id(&self) -> &'static str {
        "broken-reference"
    }

    fn applies(&self, _file: &CheckedFile) -> bool {
        true
    }

    fn evaluate(&self, file: &CheckedFile, index: &ResourceIndex) -> Vec<Finding> {
        let mut out = Vec::new();
        for node in file.doc.descendants().filter(|n| n.is_element()) {
            for attr in node.attributes() {
                self.check(file, index, node, attr.value(), &mut out);
            }
            if let Some(text) = node.text() {
                self.check(file, index, node, text.trim(), &mut out);
            }
        }
        out
    }
}

impl BrokenReference {
    fn check(
        &self,
        file: &CheckedFile,
        index: &ResourceIndex,
        node: roxmltree::Node,
        value: &str,
        out: &mut Vec<Finding>,
    ) {
        if let Some((ty, name)) = parse_reference(value) {
            if !index.contains(ty, name) {
                out.push(finding(
                    self.id(),
                    Severity::Error,
                    file,
                    line_of(file, node),
                    format!("unresolved resource reference @{ty}/{name}"),
                ));
            }
        }
    }
}

const LAYOUT_ALIASES: &[&str] = &["merge", "view", "include", "requestFocus", "ViewStub"];

struct LayoutRoot;

impl Rule for LayoutRoot {
    fn id(&self) -> &'static str {
        "layout-root"
    }

    fn applies(&self, file: &CheckedFile) -> bool {
        file.category == Category::Layout
    }

    fn evaluate(&self, file: &CheckedFile, _index: &ResourceIndex) -> Vec<Finding> {
        let root = file.doc.root_element();
        let tag = root.tag_name().name();
        // Any capitalized widget or fully-qualified class is a view; only
        // files that are clearly not layouts (e.g. a stray <resources>)
        // belong somewhere else.
        let is_view = tag.starts_with(|c: char| c.is_ascii_uppercase())
            || tag.contains('.')
            || LAYOUT_ALIASES.contains(&tag);
        if is_view {
            return Vec::new();
        }
        vec![finding(
            self.id(),
            Severity::Error,
            file,
            line_of(file, root),
            format!("layout root element <{tag}> is not a view"),
        )]
    }
}

struct LayoutDimensions;

impl Rule for LayoutDimensions {
    fn id(&self) -> &'static str {
        "layout-dimensions"
    }

    fn applies(&self, file: &CheckedFile) -> bool {
        file.category == Category::Layout
    }

    fn evaluate(&self, file: &CheckedFile, _index: &ResourceIndex) -> Vec<Finding> {
        let mut out = Vec::new();
        for node in file.doc.descendants().filter(|n| n.is_element()) {
            for attr in node.attributes() {
                let name = attr.name();
                if (name == "layout_width" || name == "layout_height")
                    && attr.value().trim().is_empty()
                {
                    out.push(finding(
                        self.id(),
                        Severity::Error,
                        file,
                        line_of(file, node),
                        format!("empty {name} on <{}>", node.tag_name().name()),
                    ));
                }
            }
        }
        out
    }
}

struct DuplicateId;

impl Rule for DuplicateId {
    fn id(&self) -> &'static str {
        "duplicate-id"
    }

    fn applies(&self, file: &CheckedFile) -> bool {
        file.category == Category::Layout
    }

    fn evaluate(&self, file: &CheckedFile, _index: &ResourceIndex) -> Vec<Finding> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        for node in file.doc.descendants().filter(|n| n.is_element()) {
            for attr in node.attributes() {
                if attr.name() != "id" {
                    continue;
                }
                if let Some(name) = attr.value().strip_prefix("@+id/") {
                    if !seen.insert(name.to_string()) {
                        out.push(finding(
                            self.id(),
                            Severity::Error,
                            file,
                            line_of(file, node),
                            format!("duplicate id declaration @+id/{name}"),
                        ));
                    }
                }
            }
        }
        out
    }
}

struct ManifestStructure;

impl Rule for ManifestStructure {
    fn id(&self) -> &'static str {
        "manifest-structure"
    }

    fn applies(&self, file: &CheckedFile) -> bool {
        file.category == Category::Manifest
    }

    fn evaluate(&self, file: &CheckedFile, _index: &ResourceIndex) -> Vec<Finding> {
        let mut out = Vec::new();
        let root = file.doc.root_element();
        if root.tag_name().name() != "manifest" {
            out.push(finding(
                self.id(),
                Severity::Error,
                file,
                line_of(file, root),
                format!(
                    "manifest root element is <{}>, expected <manifest>",
                    root.tag_name().name()
                ),
            ));
        }
        let has_application = file
            .doc
            .descendants()
            .any(|n| n.is_element() && n.tag_name().name() == "application");
        if !has_application {
            out.push(finding(
                self.id(),
                Severity::Error,
                file,
                line_of(file, root),
                "manifest declares no <application> element".to_string(),
            ));
        }
        out
    }
}

struct ColorFormat;

impl Rule for ColorFormat {
    fn id(&self) -> &'static str {
        "color-format"
    }

    fn applies(&self, file: &CheckedFile) -> bool {
        file.category == Category::Values
    }

    fn evaluate(&self, file: &CheckedFile, _index: &ResourceIndex) -> Vec<Finding> {
        let mut out = Vec::new();
        for node in file.doc.descendants().filter(|n| n.is_element()) {
            if node.tag_name().name() != "color" {
                continue;
            }
            let value = node.text().unwrap_or("").trim();
            // References are resolved by broken-reference, not here.
            if value.starts_with('@') || value.starts_with('?') {
                continue;
            }
            if !valid_color(value) {
                out.push(finding(
                    self.id(),
                    Severity::Error,
                    file,
                    line_of(file, node),
                    format!("invalid color value {value:?}"),
                ));
            }
        }
        out
    }
}

pub(crate) fn valid_color(value: &str) -> bool {
    match value.strip_prefix('#') {
        Some(digits) => {
            matches!(digits.len(), 3 | 4 | 6 | 8)
                && digits.chars().all(|c| c.is_ascii_hexdigit())
        }
        None => false,
    }
}

struct DuplicateName;

impl Rule for DuplicateName {
    fn id(&self) -> &'static str {
        "duplicate-name"
    }

    fn applies(&self, file: &CheckedFile) -> bool {
        file.category == Category::Values
    }

    fn evaluate(&self, file: &CheckedFile, _index: &ResourceIndex) -> Vec<Finding> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let root = file.doc.root_element();
        if root.tag_name().name() != "resources" {
            return out;
        }
        for child in root.children().filter(|n| n.is_element()) {
            let tag = child.tag_name().name();
            let name = match child.attribute("name") {
                Some(name) => name,
                None => continue,
            };
            let ty = match tag {
                "item" => child.attribute("type").unwrap_or("item"),
                other => other,
            };
            if !seen.insert(format!("{ty}/{name}")) {
                out.push(finding(
                    self.id(),
                    Severity::Error,
                    file,
                    line_of(file, child),
                    format!("duplicate {ty} declaration {name:?}"),
                ));
            }
        }
        out
    }
}

struct ContentDescription;

impl Rule for ContentDescription {
    fn id(&self) -> &'static str {
        "content-description"
    }

    fn applies(&self, file: &CheckedFile) -> bool {
        file.category == Category::Layout
    }

    fn evaluate(&self, file: &CheckedFile, _index: &ResourceIndex) -> Vec<Finding> {
        let mut out = Vec::new();
        for node in file.doc.descendants().filter(|n| n.is_element()) {
            let tag = node.tag_name().name();
            if tag != "ImageView" && tag != "ImageButton" {
                continue;
            }
            let described = node.attributes().any(|a| a.name() == "contentDescription");
            if !described {
                out.push(finding(
                    self.id(),
                    Severity::Warning,
                    file,
                    line_of(file, node),
                    format!("<{tag}> without contentDescription"),
                ));
            }
        }
        out
    }
}

struct EmptyString;

impl Rule for EmptyString {
    fn id(&self) -> &'static str {
        "empty-string"
    }

    fn applies(&self, file: &CheckedFile) -> bool {
        file.category == Category::Values
    }

    fn evaluate(&self, file: &CheckedFile, _index: &ResourceIndex) -> Vec<Finding> {
        let mut out = Vec::new();
        for node in file.doc.descendants().filter(|n| n.is_element()) {
            if node.tag_name().name() != "string" {
                continue;
            }
            let name = node.attribute("name").unwrap_or("?");
            if node.text().map(|t| t.trim().is_empty()).unwrap_or(true) {
                out.push(finding(
                    self.id(),
                    Severity::Warning,
                    file,
                    line_of(file, node),
                    format!("empty string resource {name:?}"),
                ));
            }
        }
        out
    }
}

struct DuplicatePermission;

impl Rule for DuplicatePermission {
    fn id(&self) -> &'static str {
        "duplicate-permission"
    }

    fn applies(&self, file: &CheckedFile) -> bool {
        file.category == Category::Manifest
    }

    fn evaluate(&self, file: &CheckedFile, _index: &ResourceIndex) -> Vec<Finding> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        for node in file.doc.descendants().filter(|n| n.is_element()) {
            if node.tag_name().name() != "uses-permission" {
                continue;
            }
            let name = match node.attribute(("http://schemas.android.com/apk/res/android", "name"))
            {
                Some(name) => name,
                None => node.attribute("name").unwrap_or(""),
            };
            if name.is_empty() {
                continue;
            }
            if !seen.insert(name.to_string()) {
                out.push(finding(
                    self.id(),
                    Severity::Warning,
                    file,
                    line_of(file, node),
                    format!("permission {name} requested more than once"),
                ));
            }
        }
        out
    }
}

struct StyleParent;

impl Rule for StyleParent {
    fn id(&self) -> &'static str {
        "style-parent"
    }

    fn applies(&self, file: &CheckedFile) -> bool {
        file.category == Category::Values
    }

    fn evaluate(&self, file: &CheckedFile, _index: &ResourceIndex) -> Vec<Finding> {
        let mut out = Vec::new();
        for node in file.doc.descendants().filter(|n| n.is_element()) {
            if node.tag_name().name() != "style" {
                continue;
            }
            let parent = match node.attribute("parent") {
                Some(parent) => parent,
                None => continue,
            };
            let ok = parent.is_empty()
                || parent.starts_with("@style/")
                || parent.starts_with("@android:style/")
                || parent.starts_with("android:");
            if !ok {
                out.push(finding(
                    self.id(),
                    Severity::Warning,
                    file,
                    line_of(file, node),
                    format!("style parent {parent:?} is not a style reference"),
                ));
            }
        }
        out
    }
}
