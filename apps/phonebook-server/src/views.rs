//! Server-side HTML rendering.
//!
//! Templates are plain HTML files read from the template directory on every
//! render, so edits show up without a restart. Two tag forms are understood:
//!
//! - `{{field}}` interpolates `id`, `name`, `phone` or `email` of the contact
//!   in scope, HTML-escaped.
//! - `{{#each contacts}} ... {{/each}}` repeats its body once per listed
//!   contact, with that contact in scope.

use std::path::PathBuf;

use domain::Contact;
use http_common::html_escape;
use thiserror::Error;

pub const CONTACTS: &str = "contacts.html";
pub const CREATE: &str = "create.html";
pub const EDIT: &str = "edit.html";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template {name}: load failed: {source}")]
    Load {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("template {name}: parse failed: {message}")]
    Parse { name: String, message: String },
    #[error("template {name}: bind failed: {message}")]
    Bind { name: String, message: String },
}

/// Data bound into a template.
#[derive(Debug, Clone, Copy)]
pub enum ViewData<'a> {
    Empty,
    Contact(&'a Contact),
    Contacts(&'a [Contact]),
}

/// Loads and renders templates from one directory.
#[derive(Debug, Clone)]
pub struct Views {
    dir: PathBuf,
}

impl Views {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn render(&self, name: &str, data: ViewData<'_>) -> Result<String, TemplateError> {
        let src = std::fs::read_to_string(self.dir.join(name)).map_err(|source| {
            TemplateError::Load {
                name: name.to_string(),
                source,
            }
        })?;
        Template::parse(name, &src)?.render(data)
    }
}

#[derive(Debug, PartialEq)]
enum Node {
    Text(String),
    Field(String),
    Each { list: String, body: Vec<Node> },
}

#[derive(Debug)]
struct Template {
    name: String,
    nodes: Vec<Node>,
}

impl Template {
    fn parse(name: &str, src: &str) -> Result<Self, TemplateError> {
        let parse_err = |message: String| TemplateError::Parse {
            name: name.to_string(),
            message,
        };

        let mut root = Vec::new();
        // open `each` blocks, innermost last
        let mut open: Vec<(String, Vec<Node>)> = Vec::new();
        let mut rest = src;

        while let Some(start) = rest.find("{{") {
            push_text(current(&mut root, &mut open), &rest[..start]);
            let after = &rest[start + 2..];
            let end = after.find("}}").ok_or_else(|| {
                let offset = src.len() - rest.len() + start;
                parse_err(format!("unclosed '{{{{' at byte {}", offset))
            })?;
            let tag = after[..end].trim();
            rest = &after[end + 2..];

            if let Some(list) = tag.strip_prefix("#each") {
                let list = list.trim();
                if !is_ident(list) {
                    return Err(parse_err(format!("malformed each tag '{{{{{tag}}}}}'")));
                }
                open.push((list.to_string(), Vec::new()));
            } else if tag == "/each" {
                let (list, body) = open
                    .pop()
                    .ok_or_else(|| parse_err("'{{/each}}' without matching '{{#each}}'".into()))?;
                current(&mut root, &mut open).push(Node::Each { list, body });
            } else if is_ident(tag) {
                current(&mut root, &mut open).push(Node::Field(tag.to_string()));
            } else {
                return Err(parse_err(format!("malformed tag '{{{{{tag}}}}}'")));
            }
        }
        push_text(current(&mut root, &mut open), rest);

        if let Some((list, _)) = open.last() {
            return Err(parse_err(format!("'{{{{#each {list}}}}}' is never closed")));
        }
        Ok(Self {
            name: name.to_string(),
            nodes: root,
        })
    }

    fn render(&self, data: ViewData<'_>) -> Result<String, TemplateError> {
        let scope = match data {
            ViewData::Contact(c) => Some(c),
            _ => None,
        };
        let mut out = String::new();
        self.render_nodes(&self.nodes, scope, data, &mut out)?;
        Ok(out)
    }

    fn render_nodes(
        &self,
        nodes: &[Node],
        scope: Option<&Contact>,
        data: ViewData<'_>,
        out: &mut String,
    ) -> Result<(), TemplateError> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Field(field) => {
                    let contact = scope.ok_or_else(|| {
                        self.bind_err(format!("'{field}' used with no contact in scope"))
                    })?;
                    let value = field_value(contact, field)
                        .ok_or_else(|| self.bind_err(format!("unknown field '{field}'")))?;
                    out.push_str(&html_escape(&value));
                }
                Node::Each { list, body } => {
                    let items = match (list.as_str(), data) {
                        ("contacts", ViewData::Contacts(items)) => items,
                        _ => return Err(self.bind_err(format!("cannot iterate '{list}'"))),
                    };
                    for item in items {
                        self.render_nodes(body, Some(item), data, out)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn bind_err(&self, message: String) -> TemplateError {
        TemplateError::Bind {
            name: self.name.clone(),
            message,
        }
    }
}

fn current<'a>(root: &'a mut Vec<Node>, open: &'a mut [(String, Vec<Node>)]) -> &'a mut Vec<Node> {
    match open.last_mut() {
        Some((_, body)) => body,
        None => root,
    }
}

fn push_text(nodes: &mut Vec<Node>, text: &str) {
    if !text.is_empty() {
        nodes.push(Node::Text(text.to_string()));
    }
}

fn is_ident(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn field_value(contact: &Contact, field: &str) -> Option<String> {
    match field {
        "id" => Some(contact.id.to_string()),
        "name" => Some(contact.name.clone()),
        "phone" => Some(contact.phone.clone()),
        "email" => Some(contact.email.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::ContactId;

    fn alice() -> Contact {
        Contact {
            id: ContactId::new(3),
            name: "Alice".into(),
            phone: "555-1234".into(),
            email: "a@x.com".into(),
        }
    }

    fn render(src: &str, data: ViewData<'_>) -> Result<String, TemplateError> {
        Template::parse("t.html", src)?.render(data)
    }

    #[test]
    fn binds_single_contact_fields() {
        let c = alice();
        let out = render(
            "<p>{{ name }} ({{id}}) {{phone}} {{email}}</p>",
            ViewData::Contact(&c),
        )
        .unwrap();
        assert_eq!(out, "<p>Alice (3) 555-1234 a@x.com</p>");
    }

    #[test]
    fn each_repeats_per_contact() {
        let mut bob = alice();
        bob.id = ContactId::new(4);
        bob.name = "Bob".into();
        let list = vec![alice(), bob];
        let out = render(
            "<ul>{{#each contacts}}<li>{{id}}:{{name}}</li>{{/each}}</ul>",
            ViewData::Contacts(&list),
        )
        .unwrap();
        assert_eq!(out, "<ul><li>3:Alice</li><li>4:Bob</li></ul>");
    }

    #[test]
    fn each_over_empty_list_renders_nothing() {
        let out = render("a{{#each contacts}}x{{/each}}b", ViewData::Contacts(&[])).unwrap();
        assert_eq!(out, "ab");
    }

    #[test]
    fn static_template_renders_without_data() {
        let out = render("<form method=\"post\" action=\"/add\"></form>", ViewData::Empty).unwrap();
        assert_eq!(out, "<form method=\"post\" action=\"/add\"></form>");
    }

    #[test]
    fn interpolated_values_are_escaped() {
        let mut c = alice();
        c.name = "<script>alert(1)</script>".into();
        c.email = "\"quoted\"@x".into();
        let out = render("<input value=\"{{email}}\">{{name}}", ViewData::Contact(&c)).unwrap();
        assert_eq!(
            out,
            "<input value=\"&quot;quoted&quot;@x\">&lt;script&gt;alert(1)&lt;/script&gt;"
        );
    }

    #[test]
    fn parse_errors() {
        for src in [
            "{{name",
            "{{#each contacts}}x",
            "x{{/each}}",
            "{{}}",
            "{{na me}}",
            "{{#each}}",
        ] {
            let err = Template::parse("t.html", src).unwrap_err();
            assert!(matches!(err, TemplateError::Parse { .. }), "source {src:?}");
        }
    }

    #[test]
    fn bind_errors() {
        let c = alice();
        let cases: [(&str, ViewData<'_>); 3] = [
            ("{{nickname}}", ViewData::Contact(&c)),
            ("{{name}}", ViewData::Empty),
            ("{{#each contacts}}{{/each}}", ViewData::Contact(&c)),
        ];
        for (src, data) in cases {
            let err = render(src, data).unwrap_err();
            assert!(matches!(err, TemplateError::Bind { .. }), "source {src:?}");
        }
    }

    #[test]
    fn parse_builds_nested_tree() {
        let t = Template::parse("t.html", "a{{#each contacts}}[{{name}}]{{/each}}").unwrap();
        assert_eq!(
            t.nodes,
            vec![
                Node::Text("a".into()),
                Node::Each {
                    list: "contacts".into(),
                    body: vec![
                        Node::Text("[".into()),
                        Node::Field("name".into()),
                        Node::Text("]".into()),
                    ],
                },
            ]
        );
    }

    #[test]
    fn shipped_templates_render() {
        let views = Views::new(concat!(env!("CARGO_MANIFEST_DIR"), "/templates"));
        let c = alice();
        let list = vec![c.clone()];

        let page = views.render(CONTACTS, ViewData::Contacts(&list)).unwrap();
        assert!(page.contains("Alice"));
        assert!(page.contains("/edit?id=3"));

        let page = views.render(CREATE, ViewData::Empty).unwrap();
        assert!(page.contains("action=\"/add\""));

        let page = views.render(EDIT, ViewData::Contact(&c)).unwrap();
        assert!(page.contains("action=\"/update\""));
        assert!(page.contains("value=\"555-1234\""));
    }

    #[test]
    fn missing_template_is_load_error() {
        let views = Views::new("/definitely/not/a/template/dir");
        let err = views.render(CREATE, ViewData::Empty).unwrap_err();
        assert!(matches!(err, TemplateError::Load { .. }));
    }
}
