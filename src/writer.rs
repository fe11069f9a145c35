//! Formats a message tree as XML text.
//!
//! ### Namespace repair
//!
//! The tree may hold names whose prefix is not bound where the
//! element ends up, for example after a prefix was redeclared or when
//! formatting a subtree on its own. Such bindings are added to the
//! output as needed:
//!
//! - an unqualified element in the scope of a default namespace,
//!   including one it declares itself, gets `xmlns=""`,
//! - a prefix that is missing is declared where it is first used,
//! - a prefix that is bound to a different namespace on the same
//!   element, or a namespaced attribute without any usable prefix,
//!   gets a generated `nsN` prefix.

use std::io::{self, Write};

use quick_xml::escape::escape;

use super::constants::XML_NAMESPACE;
use super::dom::{ChildOfElement, Document, Element, Text};
use super::QName;

/// Write options
///
/// ```
/// use sxd_soap::{writer::Writer, Package};
///
/// let package = Package::new();
/// let mut output = Vec::new();
/// Writer::new()
///     .set_single_quotes(false)
///     .set_write_declaration(false)
///     .format_document(&package.as_document(), &mut output)?;
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Writer {
    single_quotes: bool,
    write_declaration: bool,
}

impl Default for Writer {
    fn default() -> Self {
        Writer {
            single_quotes: true,
            write_declaration: true,
        }
    }
}

impl Writer {
    pub fn new() -> Writer {
        Writer::default()
    }

    /// Quote attribute values with `'` (the default) or `"`.
    pub fn set_single_quotes(mut self, single_quotes: bool) -> Writer {
        self.single_quotes = single_quotes;
        self
    }

    /// Start the output with an XML declaration (the default).
    pub fn set_write_declaration(mut self, write_declaration: bool) -> Writer {
        self.write_declaration = write_declaration;
        self
    }

    fn quote_char(&self) -> char {
        if self.single_quotes {
            '\''
        } else {
            '"'
        }
    }

    pub fn format_document<W>(&self, doc: &Document<'_>, writer: &mut W) -> io::Result<()>
    where
        W: Write + ?Sized,
    {
        tracing::trace!(protocol = %doc.protocol(), "formatting document");

        if self.write_declaration {
            let q = self.quote_char();
            write!(writer, "<?xml version={}1.0{}?>", q, q)?;
        }

        self.format_element(doc.envelope(), writer)
    }

    /// Format one element and its descendants. Bindings inherited
    /// from ancestors outside the subtree are declared on the element.
    pub fn format_element<W>(&self, element: Element<'_>, writer: &mut W) -> io::Result<()>
    where
        W: Write + ?Sized,
    {
        let mut scopes = Scopes::default();
        let mut todo = vec![Content::Element(element)];

        while let Some(content) = todo.pop() {
            match content {
                Content::Element(e) => self.format_start(e, &mut scopes, &mut todo, writer)?,
                Content::ElementEnd(name) => {
                    write!(writer, "</{}>", name)?;
                    scopes.pop();
                }
                Content::Text(t) => writer.write_all(escape(t.text()).as_bytes())?,
            }
        }

        Ok(())
    }

    fn format_start<'d, W>(
        &self,
        element: Element<'d>,
        scopes: &mut Scopes<'d>,
        todo: &mut Vec<Content<'d>>,
        writer: &mut W,
    ) -> io::Result<()>
    where
        W: Write + ?Sized,
    {
        scopes.push(
            element
                .namespace_declarations()
                .iter()
                .map(|ns| (ns.prefix().to_owned(), ns.uri())),
        );

        let name = element.name();
        let qualified_name = qualified(scopes.element_prefix(name), name.local_part());

        let attributes: Vec<_> = element
            .attributes()
            .iter()
            .map(|a| {
                let prefix = scopes.attribute_prefix(a.name());
                (qualified(prefix, a.name().local_part()), a.value())
            })
            .collect();

        let q = self.quote_char();
        write!(writer, "<{}", qualified_name)?;
        for (prefix, uri) in scopes.current() {
            if prefix.is_empty() {
                write!(writer, " xmlns={}{}{}", q, escape(*uri), q)?;
            } else {
                write!(writer, " xmlns:{}={}{}{}", prefix, q, escape(*uri), q)?;
            }
        }
        for (name, value) in &attributes {
            write!(writer, " {}={}{}{}", name, q, escape(*value), q)?;
        }

        let mut children: Vec<_> = element.child_elements().collect();
        if children.is_empty() {
            scopes.pop();
            writer.write_all(b"/>")
        } else {
            writer.write_all(b">")?;

            todo.push(Content::ElementEnd(qualified_name));
            children.reverse();
            todo.extend(children.into_iter().map(|c| match c {
                ChildOfElement::Element(e) => Content::Element(e),
                ChildOfElement::Text(t) => Content::Text(t),
            }));

            Ok(())
        }
    }
}

enum Content<'d> {
    Element(Element<'d>),
    ElementEnd(String),
    Text(Text<'d>),
}

fn qualified(prefix: Option<String>, local_part: &str) -> String {
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, local_part),
        _ => local_part.to_owned(),
    }
}

/// The bindings written so far, one level per open element.
#[derive(Default)]
struct Scopes<'d> {
    levels: Vec<Vec<(String, &'d str)>>,
    generated: usize,
}

impl<'d> Scopes<'d> {
    fn push<I>(&mut self, declarations: I)
    where
        I: IntoIterator<Item = (String, &'d str)>,
    {
        self.levels.push(declarations.into_iter().collect());
    }

    fn pop(&mut self) {
        self.levels.pop();
    }

    fn current(&self) -> &[(String, &'d str)] {
        self.levels.last().map(|l| l.as_slice()).unwrap_or(&[])
    }

    /// Bind `prefix` on the current element, replacing its own binding.
    fn declare(&mut self, prefix: String, uri: &'d str) {
        if let Some(level) = self.levels.last_mut() {
            match level.iter_mut().find(|(p, _)| *p == prefix) {
                Some(binding) => binding.1 = uri,
                None => level.push((prefix, uri)),
            }
        }
    }

    fn lookup(&self, prefix: &str) -> Option<&'d str> {
        self.levels
            .iter()
            .rev()
            .flat_map(|l| l.iter())
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| *uri)
            .filter(|uri| !uri.is_empty())
    }

    fn declared_here(&self, prefix: &str) -> bool {
        self.current().iter().any(|(p, _)| p == prefix)
    }

    fn prefix_bound_to(&self, uri: &str) -> Option<String> {
        self.levels
            .iter()
            .rev()
            .flat_map(|l| l.iter())
            .map(|(p, _)| p)
            .find(|p| !p.is_empty() && self.lookup(p) == Some(uri))
            .cloned()
    }

    fn generate(&mut self, uri: &'d str) -> String {
        loop {
            let prefix = format!("ns{}", self.generated);
            self.generated += 1;
            if self.lookup(&prefix).is_none() && !self.declared_here(&prefix) {
                self.declare(prefix.clone(), uri);
                return prefix;
            }
        }
    }

    /// Use `preferred` if possible, declaring it here when it is free.
    fn bind(&mut self, preferred: &str, uri: &'d str) -> String {
        if self.lookup(preferred) == Some(uri) {
            preferred.to_owned()
        } else if !self.declared_here(preferred) {
            self.declare(preferred.to_owned(), uri);
            preferred.to_owned()
        } else {
            self.generate(uri)
        }
    }

    fn element_prefix(&mut self, name: QName<'d>) -> Option<String> {
        match name.namespace_uri() {
            Some(uri) => Some(self.bind(name.prefix().unwrap_or(""), uri)),
            None => {
                if self.lookup("").is_some() {
                    self.declare(String::new(), "");
                }
                None
            }
        }
    }

    fn attribute_prefix(&mut self, name: QName<'d>) -> Option<String> {
        let uri = name.namespace_uri()?;
        if uri == XML_NAMESPACE {
            return Some("xml".to_owned());
        }

        match name.prefix() {
            Some(prefix) if self.lookup(prefix) == Some(uri) => Some(prefix.to_owned()),
            preferred => {
                if let Some(bound) = self.prefix_bound_to(uri) {
                    return Some(bound);
                }
                match preferred {
                    Some(prefix) if !self.declared_here(prefix) => Some(self.bind(prefix, uri)),
                    _ => Some(self.generate(uri)),
                }
            }
        }
    }
}

/// Format a document with the default options.
pub fn format_document<W>(doc: &Document<'_>, writer: &mut W) -> io::Result<()>
where
    W: Write + ?Sized,
{
    Writer::default().format_document(doc, writer)
}

#[cfg(test)]
mod test {
    use super::super::{Package, Protocol, QName};
    use super::super::dom::{Document, Element};
    use super::Writer;

    fn format_xml(doc: &Document) -> String {
        format_xml_writer(Writer::new().set_write_declaration(false), doc)
    }

    fn format_xml_writer(writer: Writer, doc: &Document) -> String {
        let mut w = Vec::new();
        writer.format_document(doc, &mut w).expect("Not formatted");
        String::from_utf8(w).expect("Not a string")
    }

    fn format_subtree(element: Element) -> String {
        let mut w = Vec::new();
        Writer::new().format_element(element, &mut w).expect("Not formatted");
        String::from_utf8(w).expect("Not a string")
    }

    #[test]
    fn empty_soap_1_1_message() {
        let package = Package::new();
        let doc = package.as_document();

        let xml = format_xml_writer(Writer::new(), &doc);
        assert_eq!(
            xml,
            "<?xml version='1.0'?>\
             <SOAP-ENV:Envelope xmlns:SOAP-ENV='http://schemas.xmlsoap.org/soap/envelope/'>\
             <SOAP-ENV:Header/><SOAP-ENV:Body/></SOAP-ENV:Envelope>"
        );
    }

    #[test]
    fn empty_soap_1_2_message() {
        let package = Package::with_protocol(Protocol::Soap12);
        let doc = package.as_document();

        let xml = format_xml(&doc);
        assert_eq!(
            xml,
            "<env:Envelope xmlns:env='http://www.w3.org/2003/05/soap-envelope'>\
             <env:Header/><env:Body/></env:Envelope>"
        );
    }

    #[test]
    fn nested_element_with_text_and_attributes() {
        let package = Package::new();
        let doc = package.as_document();
        let body = doc.body().unwrap();
        body.add_child_element("hello").unwrap()
            .add_attribute("a", "1 < 2").unwrap()
            .add_text_node("fish & chips").unwrap();

        let xml = format_subtree(body);
        assert_eq!(
            xml,
            "<SOAP-ENV:Body xmlns:SOAP-ENV='http://schemas.xmlsoap.org/soap/envelope/'>\
             <hello a='1 &lt; 2'>fish &amp; chips</hello></SOAP-ENV:Body>"
        );
    }

    #[test]
    fn declared_namespaces_are_written() {
        let package = Package::new();
        let doc = package.as_document();
        let body = doc.body().unwrap();
        let order = body.add_child_element(("order", "shop", "urn:shop")).unwrap();
        order.add_child_element(("item", "shop")).unwrap();

        assert_eq!(
            format_subtree(order),
            "<shop:order xmlns:shop='urn:shop'><shop:item/></shop:order>"
        );
    }

    #[test]
    fn inherited_namespaces_are_declared_on_a_subtree() {
        let package = Package::new();
        let doc = package.as_document();
        let body = doc.body().unwrap();
        let order = body.add_child_element(("order", "shop", "urn:shop")).unwrap();
        let item = order.add_child_element(("item", "shop")).unwrap();

        assert_eq!(format_subtree(item), "<shop:item xmlns:shop='urn:shop'/>");
    }

    #[test]
    fn unqualified_elements_undeclare_the_default_namespace() {
        let package = Package::new();
        let doc = package.as_document();
        let body = doc.body().unwrap();
        let parent = body.add_child_element(QName::with_namespace_uri(Some("urn:a"), "parent")).unwrap();
        parent.add_child_element(QName::new("child")).unwrap();

        assert_eq!(
            format_subtree(parent),
            "<parent xmlns='urn:a'><child xmlns=''/></parent>"
        );
    }

    #[test]
    fn unqualified_elements_override_their_own_default_namespace() {
        let package = Package::new();
        let doc = package.as_document();
        let body = doc.body().unwrap();
        let e = body.add_child_element(QName::new("e")).unwrap();
        e.add_namespace_declaration("", "urn:a").unwrap();
        e.add_child_element(QName::with_namespace_uri(Some("urn:a"), "f")).unwrap();

        assert_eq!(format_subtree(e), "<e xmlns=''><f xmlns='urn:a'/></e>");
    }

    #[test]
    fn unprefixed_namespaced_attributes_get_a_prefix() {
        let package = Package::new();
        let doc = package.as_document();
        let body = doc.body().unwrap();
        let e = body.add_child_element("e").unwrap();
        e.add_attribute(QName::with_namespace_uri(Some("urn:x"), "id"), "1").unwrap();

        assert_eq!(format_subtree(e), "<e xmlns:ns0='urn:x' ns0:id='1'/>");
    }

    #[test]
    fn rebound_prefixes_are_repaired() {
        let package = Package::new();
        let doc = package.as_document();
        let body = doc.body().unwrap();
        let bar = body.add_child_element(("Bar", "ex", "urn:ex")).unwrap();
        bar.add_namespace_declaration("ex", "urn:other").unwrap();

        assert_eq!(
            format_subtree(bar),
            "<ns0:Bar xmlns:ex='urn:other' xmlns:ns0='urn:ex'/>"
        );
    }

    #[test]
    fn header_entries_are_written_with_their_attributes() {
        let package = Package::with_protocol(Protocol::Soap12);
        let doc = package.as_document();
        let header = doc.header().unwrap();
        let trace = header.add_header_element(QName::with_prefix("urn:t", "Trace", "t")).unwrap();
        trace.set_must_understand(true).unwrap();

        let xml = format_xml(&doc);
        assert_eq!(
            xml,
            "<env:Envelope xmlns:env='http://www.w3.org/2003/05/soap-envelope'>\
             <env:Header><t:Trace xmlns:t='urn:t' env:mustUnderstand='true'/></env:Header>\
             <env:Body/></env:Envelope>"
        );
    }

    #[test]
    fn entries_rebinding_the_envelope_prefix_keep_their_attributes_apart() {
        let package = Package::with_protocol(Protocol::Soap12);
        let doc = package.as_document();
        let header = doc.header().unwrap();
        let trace = header.add_header_element(QName::with_prefix("urn:mine", "Trace", "env")).unwrap();
        trace.set_must_understand(true).unwrap();

        assert_eq!(
            format_subtree(trace.element()),
            "<env:Trace xmlns:env='urn:mine' \
             xmlns:ns0='http://www.w3.org/2003/05/soap-envelope' ns0:mustUnderstand='true'/>"
        );
    }

    #[test]
    fn double_quotes_can_be_used() {
        let package = Package::new();
        let doc = package.as_document();
        let body = doc.body().unwrap();
        body.add_child_element("e").unwrap().add_attribute("say", "\"hi\"").unwrap();

        let mut w = Vec::new();
        Writer::new()
            .set_single_quotes(false)
            .format_element(body.child_elements().next().unwrap().element().unwrap(), &mut w)
            .unwrap();

        assert_eq!(String::from_utf8(w).unwrap(), r#"<e say="&quot;hi&quot;"/>"#);
    }

    #[test]
    fn the_free_function_writes_a_declaration() {
        let package = Package::new();
        let mut w = Vec::new();

        super::format_document(&package.as_document(), &mut w).unwrap();

        assert!(String::from_utf8(w).unwrap().starts_with("<?xml version='1.0'?>"));
    }
}
