//! Parsing of CAS XML payloads.
//!
//! Two documents reach the client: the `serviceResponse` returned by
//! `serviceValidate`, and the SAML `LogoutRequest` the server posts for
//! single logout. Both are read event by event, matching on local names so
//! the `cas:`/`samlp:` prefixes do not matter.

use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::cas::types::{AuthenticationResponse, CasError};

/// Parse a `serviceValidate` response body.
pub fn parse_service_response(xml: &str) -> Result<AuthenticationResponse, CasError> {
    let mut reader = Reader::from_str(xml);

    let mut stack: Vec<String> = Vec::new();
    let mut text = String::new();
    let mut saw_root = false;
    let mut success: Option<AuthenticationResponse> = None;
    let mut failure_code: Option<String> = None;
    let mut failure: Option<(String, String)> = None;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => {
                let name = local_name(e);
                match (stack.len(), name.as_str()) {
                    (0, "serviceResponse") => saw_root = true,
                    (1, "authenticationSuccess") => success = Some(AuthenticationResponse::default()),
                    (1, "authenticationFailure") => {
                        failure_code = Some(attribute(e, "code").unwrap_or_else(|| "UNKNOWN".into()))
                    }
                    _ => {}
                }
                stack.push(name);
                text.clear();
            }
            Event::Empty(ref e) => {
                let name = local_name(e);
                if stack.len() == 1 && name == "authenticationFailure" {
                    let code = attribute(e, "code").unwrap_or_else(|| "UNKNOWN".into());
                    failure = Some((code, String::new()));
                } else if let Some(resp) = success.as_mut() {
                    if is_attributes_block(&stack) {
                        record_attribute(resp, &name, String::new());
                    }
                }
            }
            Event::Text(ref e) => {
                let raw = String::from_utf8_lossy(e.as_ref()).into_owned();
                match unescape(&raw) {
                    Ok(value) => text.push_str(&value),
                    Err(_) => text.push_str(&raw),
                }
            }
            Event::CData(ref e) => text.push_str(&String::from_utf8_lossy(e.as_ref())),
            Event::GeneralRef(ref e) => {
                let name = String::from_utf8_lossy(e.as_ref()).into_owned();
                text.push_str(&resolve_reference(&name).ok_or_else(|| {
                    CasError::MalformedResponse(format!("unknown entity '&{};'", name))
                })?);
            }
            Event::End(_) => {
                let value = text.trim().to_string();
                text.clear();
                let path: Vec<&str> = stack.iter().map(String::as_str).collect();
                match path.as_slice() {
                    ["serviceResponse", "authenticationFailure"] => {
                        let code = failure_code.take().unwrap_or_else(|| "UNKNOWN".into());
                        failure = Some((code, value));
                    }
                    ["serviceResponse", "authenticationSuccess", "user"] => {
                        if let Some(resp) = success.as_mut() {
                            resp.user = value;
                        }
                    }
                    ["serviceResponse", "authenticationSuccess", "proxyGrantingTicket"] => {
                        if let Some(resp) = success.as_mut() {
                            resp.proxy_granting_ticket = Some(value);
                        }
                    }
                    ["serviceResponse", "authenticationSuccess", "proxies", "proxy"] => {
                        if let Some(resp) = success.as_mut() {
                            resp.proxies.push(value);
                        }
                    }
                    ["serviceResponse", "authenticationSuccess", "attributes", key] => {
                        if let Some(resp) = success.as_mut() {
                            record_attribute(resp, key, value);
                        }
                    }
                    _ => {}
                }
                stack.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some((code, message)) = failure {
        return Err(CasError::AuthenticationFailure { code, message });
    }

    match success {
        Some(resp) if resp.user.is_empty() => Err(CasError::MalformedResponse(
            "authenticationSuccess without user".into(),
        )),
        Some(resp) => Ok(resp),
        None if !saw_root => Err(CasError::MalformedResponse(
            "not a CAS serviceResponse document".into(),
        )),
        None => Err(CasError::MalformedResponse(
            "serviceResponse carries no authentication result".into(),
        )),
    }
}

/// Extract the `SessionIndex` (the service ticket) from a SAML logout request.
pub fn parse_logout_request(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    let mut in_index = false;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => in_index = local_name(e) == "SessionIndex",
            Ok(Event::Text(ref e)) if in_index => {
                text.push_str(&String::from_utf8_lossy(e.as_ref()));
            }
            Ok(Event::End(_)) if in_index => {
                let ticket = text.trim();
                return (!ticket.is_empty()).then(|| ticket.to_string());
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn attribute(e: &BytesStart<'_>, name: &str) -> Option<String> {
    let attr = e.try_get_attribute(name).ok().flatten()?;
    let raw = String::from_utf8_lossy(&attr.value).into_owned();
    let value = match unescape(&raw) {
        Ok(value) => value.into_owned(),
        Err(_) => raw.clone(),
    };
    Some(value)
}

fn is_attributes_block(stack: &[String]) -> bool {
    stack.len() == 3 && stack[1] == "authenticationSuccess" && stack[2] == "attributes"
}

fn resolve_reference(name: &str) -> Option<String> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }
    resolve_predefined_entity(name).map(str::to_string)
}

/// Route a released attribute to its typed field or the attribute map.
fn record_attribute(resp: &mut AuthenticationResponse, key: &str, value: String) {
    match key {
        "authenticationDate" => resp.authentication_date = Some(value),
        "isFromNewLogin" => resp.is_new_login = value.eq_ignore_ascii_case("true"),
        "longTermAuthenticationRequestTokenUsed" => {
            resp.is_remembered_login = value.eq_ignore_ascii_case("true")
        }
        "memberOf" => resp.member_of.push(value),
        _ => resp.attributes.add(key, value),
    }
}
