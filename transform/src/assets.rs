//! Asset marker pipeline, post-pass side
//!
//! During evaluation an asset import is a literal marker string
//! (`@wd40-asset:<absolutePath>:@wd40-asset`) so the sandbox never loads
//! binary content. Before a handler's replacement AST is spliced into the
//! source, every string literal containing a marker becomes a template
//! literal: the marker's path turns into a fresh default import of the
//! path relative to the importer, interpolated between the surviving text.
//! One identifier is allocated per occurrence; identical assets referenced
//! twice get two imports.
//!
//! A `#fragment` carried by the marker path (CSS `url(./a.svg#a)` form)
//! stays outside the interpolation.

use std::path::{Component, Path, PathBuf};

use parser::js_ast::*;
use parser::visit::{walk_expression_mut, VisitMut};

use crate::constants::{ASSET_PREFIX, ASSET_SUFFIX};

/// Replace asset markers inside `node`'s string literals with template
/// literals, requesting one default import per occurrence through
/// `add_default_import(hint, relative_path) -> local_name`.
pub fn replace_assets_with_imports(
    project_root: &str,
    filename: &str,
    node: &mut Expression,
    add_default_import: &mut dyn FnMut(&str, &str) -> String,
) {
    let mut rewriter = AssetRewriter { project_root, filename, add_default_import };
    rewriter.visit_expression_mut(node);
}

struct AssetRewriter<'a> {
    project_root: &'a str,
    filename: &'a str,
    add_default_import: &'a mut dyn FnMut(&str, &str) -> String,
}

impl VisitMut for AssetRewriter<'_> {
    fn visit_expression_mut(&mut self, expression: &mut Expression) {
        if let Expression::String(literal) = expression {
            if literal.value.contains(ASSET_PREFIX) {
                *expression = self.build_template_literal(&literal.value);
                return;
            }
        }
        walk_expression_mut(self, expression);
    }
}

impl AssetRewriter<'_> {
    fn build_template_literal(&mut self, value: &str) -> Expression {
        let mut quasis: Vec<TemplateElement> = Vec::new();
        let mut expressions: Vec<Expression> = Vec::new();

        let mut offset = 0;
        while let Some(found) = value[offset..].find(ASSET_PREFIX) {
            let index = offset + found;
            push_quasi(&mut quasis, &value[offset..index], false);

            let path_start = index + ASSET_PREFIX.len();
            let (pathname, after_marker) = match value[path_start..].find(ASSET_SUFFIX) {
                Some(end) => (
                    &value[path_start..path_start + end],
                    path_start + end + ASSET_SUFFIX.len(),
                ),
                None => {
                    // Unterminated marker: keep the rest verbatim
                    push_quasi(&mut quasis, &value[index..], true);
                    return finish_template(quasis, expressions);
                }
            };
            offset = after_marker;

            // A fragment inside the marker path stays outside the
            // interpolation: url(${asset}#a)
            let (file_path, fragment) = match pathname.split_once('#') {
                Some((file_path, fragment)) => (file_path, Some(fragment)),
                None => (pathname, None),
            };

            let relative = absolute_path_to_relative(self.project_root, self.filename, file_path);
            let local = (self.add_default_import)("asset", &relative);

            expressions.push(Expression::Identifier(Identifier::new(local)));

            if let Some(fragment) = fragment {
                // The fragment joins the following text in the next quasi
                let mut tail = String::from("#");
                tail.push_str(fragment);
                let rest = &value[offset..];
                let next_marker = rest.find(ASSET_PREFIX);
                match next_marker {
                    Some(next) => {
                        tail.push_str(&rest[..next]);
                        push_quasi(&mut quasis, &tail, false);
                        offset += next;
                        // Re-enter the loop at the next marker with the
                        // quasi already emitted
                        continue;
                    }
                    None => {
                        tail.push_str(rest);
                        push_quasi(&mut quasis, &tail, true);
                        return finish_template(quasis, expressions);
                    }
                }
            }
        }

        push_quasi(&mut quasis, &value[offset..], true);
        finish_template(quasis, expressions)
    }
}

fn push_quasi(quasis: &mut Vec<TemplateElement>, text: &str, tail: bool) {
    quasis.push(TemplateElement {
        raw: escape_template_text(text),
        cooked: text.to_string(),
        tail,
        span: Span::default(),
    });
}

fn finish_template(
    mut quasis: Vec<TemplateElement>,
    expressions: Vec<Expression>,
) -> Expression {
    // The template invariant: one more quasi than expressions
    while quasis.len() < expressions.len() + 1 {
        push_quasi(&mut quasis, "", true);
    }
    if let Some(last) = quasis.last_mut() {
        last.tail = true;
    }
    Expression::Template(TemplateLiteral {
        quasis,
        expressions,
        span: Span::default(),
    })
}

fn escape_template_text(text: &str) -> String {
    text.replace('\\', "\\\\").replace('`', "\\`").replace("${", "\\${")
}

/// Strip asset markers from accumulated CSS text, leaving the absolute
/// paths in place
pub fn strip_asset_markers(text: &str) -> String {
    text.replace(ASSET_PREFIX, "").replace(ASSET_SUFFIX, "")
}

/// Compute the import path for an asset relative to the importing file.
/// Asset paths outside the project root are joined onto it first.
pub fn absolute_path_to_relative(project_root: &str, filename: &str, asset_path: &str) -> String {
    let absolute = if Path::new(asset_path).starts_with(project_root) {
        PathBuf::from(asset_path)
    } else {
        Path::new(project_root).join(asset_path.trim_start_matches('/'))
    };

    let importer_dir = Path::new(filename)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/"));

    let relative = relative_path(&importer_dir, &absolute);
    let text = relative.to_string_lossy();
    if text.starts_with('.') {
        text.into_owned()
    } else {
        format!("./{}", text)
    }
}

fn relative_path(from_dir: &Path, to: &Path) -> PathBuf {
    let from: Vec<Component<'_>> = from_dir.components().collect();
    let to_parts: Vec<Component<'_>> = to.components().collect();

    let common = from
        .iter()
        .zip(to_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut result = PathBuf::new();
    for _ in common..from.len() {
        result.push("..");
    }
    for component in &to_parts[common..] {
        result.push(component.as_os_str());
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use parser::expression_to_code;

    const ROOT: &str = "/home/user/project";
    const FILE: &str = "/home/user/project/src/index.ts";

    fn rewrite(value: &str) -> (String, Vec<(String, String)>) {
        let mut node = Expression::String(StringLiteral::new(value));
        let mut imports = Vec::new();
        let mut counter = 0;

        replace_assets_with_imports(ROOT, FILE, &mut node, &mut |hint, path| {
            counter += 1;
            let local = format!("_{}{}", hint, counter);
            imports.push((local.clone(), path.to_string()));
            local
        });

        (expression_to_code(&node), imports)
    }

    #[test]
    fn test_unrelated_strings_are_untouched() {
        let (code, imports) = rewrite(".foo { background-image: url(image.png) }");
        assert_eq!(code, "\".foo { background-image: url(image.png) }\"");
        assert!(imports.is_empty());
    }

    #[test]
    fn test_marker_becomes_template_with_relative_import() {
        let (code, imports) =
            rewrite(".foo { background-image: url(@wd40-asset:/assets/image.png:@wd40-asset) }");

        assert_eq!(
            code,
            "`.foo { background-image: url(${_asset1}) }`"
        );
        assert_eq!(imports, vec![("_asset1".to_string(), "../assets/image.png".to_string())]);
    }

    #[test]
    fn test_asset_under_project_root() {
        let (code, imports) = rewrite(
            "url(@wd40-asset:/home/user/project/src/blank.jpg:@wd40-asset)",
        );
        assert_eq!(code, "`url(${_asset1})`");
        assert_eq!(imports[0].1, "./blank.jpg");
    }

    #[test]
    fn test_fragment_stays_outside_interpolation() {
        let (code, imports) =
            rewrite("url(@wd40-asset:/assets/image.svg#path:@wd40-asset) no-repeat");
        assert_eq!(code, "`url(${_asset1}#path) no-repeat`");
        assert_eq!(imports[0].1, "../assets/image.svg");
    }

    #[test]
    fn test_multiple_markers_get_distinct_imports() {
        let (code, imports) = rewrite(
            "url(@wd40-asset:/a.png:@wd40-asset) url(@wd40-asset:/a.png:@wd40-asset)",
        );
        assert_eq!(code, "`url(${_asset1}) url(${_asset2})`");
        assert_eq!(imports.len(), 2);
        assert_eq!(imports[0].1, imports[1].1);
    }

    #[test]
    fn test_markers_inside_nested_expressions() {
        let mut node = Expression::Array(ArrayExpression {
            elements: vec![Expression::String(StringLiteral::new(
                "url(@wd40-asset:/img.png:@wd40-asset)",
            ))],
            span: Span::default(),
        });
        let mut count = 0;
        replace_assets_with_imports(ROOT, FILE, &mut node, &mut |_, _| {
            count += 1;
            format!("_asset{}", count)
        });

        assert_eq!(expression_to_code(&node), "[`url(${_asset1})`]");
    }

    #[test]
    fn test_strip_asset_markers() {
        assert_eq!(
            strip_asset_markers(".a{background:url(@wd40-asset:/x.png:@wd40-asset);}"),
            ".a{background:url(/x.png);}"
        );
    }

    #[test]
    fn test_absolute_path_to_relative() {
        assert_eq!(
            absolute_path_to_relative(ROOT, FILE, "/assets/image.png"),
            "../assets/image.png"
        );
        assert_eq!(
            absolute_path_to_relative(ROOT, FILE, "/home/user/project/src/img.png"),
            "./img.png"
        );
        assert_eq!(
            absolute_path_to_relative("/abs", "/abs/file.ts", "/abs/img.png"),
            "./img.png"
        );
    }
}
