//! Minimal owned XML tree for SOAP responses.
//!
//! Element and attribute names are stored without namespace prefixes and
//! matched case-sensitively, since the services mix `WL`, `sigma` and `I`.

use super::{Result, UpstreamError};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlNode {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    /// Parse a document into a tree rooted at an unnamed document node.
    pub fn parse(xml: &str) -> Result<XmlNode> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack = vec![XmlNode::default()];

        loop {
            match reader.read_event() {
                Ok(Event::Start(start)) => stack.push(XmlNode::open(&start)?),
                Ok(Event::Empty(start)) => {
                    let node = XmlNode::open(&start)?;
                    push_child(&mut stack, node)?;
                }
                Ok(Event::End(_)) => {
                    if stack.len() < 2 {
                        return Err(decode_error(&reader, "unbalanced closing tag"));
                    }
                    let node = stack.pop().unwrap_or_default();
                    push_child(&mut stack, node)?;
                }
                Ok(Event::Text(text)) => {
                    let text = text
                        .unescape()
                        .map_err(|e| UpstreamError::Decode(e.to_string()))?;
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&text);
                    }
                }
                Ok(Event::CData(data)) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(decode_error(&reader, &e.to_string())),
            }
        }

        if stack.len() != 1 {
            return Err(UpstreamError::Decode("unterminated element".to_string()));
        }

        Ok(stack.pop().unwrap_or_default())
    }

    fn open(start: &BytesStart<'_>) -> Result<XmlNode> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut attributes = Vec::new();

        for attr in start.attributes() {
            let attr = attr.map_err(|e| UpstreamError::Decode(e.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| UpstreamError::Decode(e.to_string()))?
                .into_owned();
            attributes.push((key, value));
        }

        Ok(XmlNode {
            name,
            attributes,
            ..Default::default()
        })
    }

    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Depth-first search for the first descendant (or self) named `name`.
    pub fn find(&self, name: &str) -> Option<&XmlNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.as_str())
    }

    /// Attribute value, falling back to a child element's text.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.attribute(name).or_else(|| self.child_text(name))
    }

    /// Required field parsed into `T`.
    pub fn parse_value<T: std::str::FromStr>(&self, name: &str) -> Result<T> {
        let raw = self.value(name).ok_or_else(|| {
            UpstreamError::Decode(format!("<{}> is missing field {name}", self.name))
        })?;
        raw.trim().parse().map_err(|_| {
            UpstreamError::Decode(format!("<{}> field {name} is not valid: {raw:?}", self.name))
        })
    }

    pub fn required_text(&self, name: &str) -> Result<String> {
        self.value(name).map(str::to_string).ok_or_else(|| {
            UpstreamError::Decode(format!("<{}> is missing field {name}", self.name))
        })
    }
}

fn push_child(stack: &mut [XmlNode], node: XmlNode) -> Result<()> {
    let parent = stack
        .last_mut()
        .ok_or_else(|| UpstreamError::Decode("element outside document".to_string()))?;
    parent.children.push(node);
    Ok(())
}

fn decode_error(reader: &Reader<&[u8]>, message: &str) -> UpstreamError {
    UpstreamError::Decode(format!(
        "{message} at byte {}",
        reader.buffer_position()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/">
  <soapenv:Body>
    <stations>
      <station ID="Seattle" name="9447130">
        <metadata><location><lat>47.6</lat><long>-122.3</long><state>WA</state></location></metadata>
        <parameter name="Winds" sensorID="C1" DCP="1" status="1"/>
      </station>
    </stations>
  </soapenv:Body>
</soapenv:Envelope>"#;

    #[test]
    fn test_parse_strips_prefixes_and_reads_attributes() {
        let root = XmlNode::parse(SAMPLE).unwrap();
        let body = root.find("Body").unwrap();
        let station = body.find("station").unwrap();

        assert_eq!(station.attribute("ID"), Some("Seattle"));
        assert_eq!(station.attribute("name"), Some("9447130"));

        let location = station.find("location").unwrap();
        assert_eq!(location.parse_value::<f64>("lat").unwrap(), 47.6);
        assert_eq!(location.child_text("state"), Some("WA"));

        let param = station.child("parameter").unwrap();
        assert_eq!(param.parse_value::<i64>("DCP").unwrap(), 1);
    }

    #[test]
    fn test_parse_unescapes_text() {
        let root = XmlNode::parse("<a><b>x &amp; y</b></a>").unwrap();
        assert_eq!(root.find("b").unwrap().text, "x & y");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            XmlNode::parse("<a><b></a>"),
            Err(UpstreamError::Decode(_))
        ));
        assert!(matches!(
            XmlNode::parse("<a><b>"),
            Err(UpstreamError::Decode(_))
        ));
    }

    #[test]
    fn test_parse_value_reports_missing_and_invalid() {
        let root = XmlNode::parse("<item><WL>abc</WL></item>").unwrap();
        let item = root.child("item").unwrap();
        assert!(item.parse_value::<f64>("WL").is_err());
        assert!(item.parse_value::<f64>("sigma").is_err());
    }
}
