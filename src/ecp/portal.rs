use std::path::Path;
use std::time::Duration;

use digest_auth::{AuthContext, HttpMethod};
use reqwest::StatusCode;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use tracing::{debug, info};

use crate::error::{DriverError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

#[derive(Debug, Clone)]
pub struct Screenshot {
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

/// The device's developer web server: sideloading and screen capture.
pub trait DeveloperPortal: Send {
    /// Sideload a zipped channel. It becomes the `dev` app.
    fn install(&self, archive: &Path) -> Result<()>;

    /// Remove the sideloaded `dev` app.
    fn remove(&self) -> Result<()>;

    fn screenshot(&self) -> Result<Screenshot>;
}

pub struct HttpDeveloperPortal {
    client: Client,
    base_url: String,
    user: String,
    password: String,
}

impl HttpDeveloperPortal {
    pub fn new(host: &str, port: u16, user: &str, password: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DriverError::transport("portal client builder", e))?;

        Ok(HttpDeveloperPortal {
            client,
            base_url: format!("http://{}:{}", host.trim(), port),
            user: user.to_string(),
            password: password.to_string(),
        })
    }

    /// Request `path` unauthenticated to obtain the digest challenge.
    fn challenge(&self, path: &str) -> Result<Option<String>> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.get(&url).send()?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        let header = response
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| DriverError::protocol(path, "401 without WWW-Authenticate"))?;
        Ok(Some(header.to_string()))
    }

    fn authorized(&self, builder: RequestBuilder, method: &str, path: &str) -> Result<RequestBuilder> {
        match self.challenge(path)? {
            Some(challenge) => {
                let header = digest_authorization(&challenge, &self.user, &self.password, method, path, None)?;
                Ok(builder.header(AUTHORIZATION, header))
            }
            None => Ok(builder),
        }
    }

    fn post_form(&self, path: &str, form: Form) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.authorized(self.client.post(&url), "POST", path)?;
        let response = builder.multipart(form).send()?;
        read_body(path, response)
    }

    fn get_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.authorized(self.client.get(&url), "GET", path)?;
        let response = builder.send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(DriverError::protocol(path, format!("HTTP {}", status.as_u16())));
        }
        Ok(response.bytes()?.to_vec())
    }
}

fn read_body(path: &str, response: Response) -> Result<String> {
    let status = response.status();
    let body = response.text()?;
    if status == StatusCode::UNAUTHORIZED {
        return Err(DriverError::protocol(path, "developer credentials rejected"));
    }
    if !status.is_success() {
        return Err(DriverError::protocol(path, format!("HTTP {}", status.as_u16())));
    }
    Ok(body)
}

impl DeveloperPortal for HttpDeveloperPortal {
    fn install(&self, archive: &Path) -> Result<()> {
        let bytes = std::fs::read(archive).map_err(|e| DriverError::Io {
            context: format!("reading {}", archive.display()),
            source: e,
        })?;
        let file_name = archive
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "channel.zip".to_string());

        info!(archive = %archive.display(), size = bytes.len(), "sideloading channel");
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/zip")
            .map_err(|e| DriverError::InvalidArgument(e.to_string()))?;
        let form = Form::new().text("mysubmit", "Install").part("archive", part);

        let body = self.post_form("/plugin_install", form)?;
        install_outcome(&body)
    }

    fn remove(&self) -> Result<()> {
        let form = Form::new()
            .text("mysubmit", "Delete")
            .text("archive", "");
        let body = self.post_form("/plugin_install", form)?;
        debug!(len = body.len(), "dev app removal response");
        Ok(())
    }

    fn screenshot(&self) -> Result<Screenshot> {
        let form = Form::new()
            .text("mysubmit", "Screenshot")
            .text("passwd", "")
            .text("archive", "");
        let body = self.post_form("/plugin_inspect", form)?;
        let image_path = screenshot_path(&body).ok_or_else(|| {
            DriverError::protocol("/plugin_inspect", "no screenshot reference in response")
        })?;
        let format = if image_path.contains(".png") {
            ImageFormat::Png
        } else {
            ImageFormat::Jpeg
        };
        let bytes = self.get_bytes(&format!("/{}", image_path))?;
        Ok(Screenshot { format, bytes })
    }
}

/// Interpret the HTML the installer answers with.
pub fn install_outcome(body: &str) -> Result<()> {
    if body.contains("Install Success") || body.contains("Identical to previous version") {
        return Ok(());
    }
    let reason = body
        .find("Install Failure")
        .map(|i| {
            body[i..]
                .split('<')
                .next()
                .unwrap_or("Install Failure")
                .trim()
                .to_string()
        })
        .unwrap_or_else(|| "installer did not report success".to_string());
    Err(DriverError::protocol("/plugin_install", reason))
}

/// Find `pkgs/dev.png?time=...` (or `.jpg`) in the inspect page.
pub fn screenshot_path(body: &str) -> Option<String> {
    let start = body.find("pkgs/dev.")?;
    let rest = &body[start..];
    let end = rest
        .find(|c: char| c == '"' || c == '\'' || c == ')' || c.is_whitespace())
        .unwrap_or(rest.len());
    Some(rest[..end].to_string())
}

// ============================================================================
// HTTP Digest
// ============================================================================

/// Answer a `WWW-Authenticate: Digest ...` challenge for `method uri`. The
/// client nonce is random unless `cnonce` pins it.
pub fn digest_authorization(
    challenge: &str,
    user: &str,
    password: &str,
    method: &str,
    uri: &str,
    cnonce: Option<&str>,
) -> Result<String> {
    let mut prompt = digest_auth::parse(challenge)
        .map_err(|e| DriverError::protocol("digest", format!("unusable challenge '{}': {}", challenge, e)))?;

    let method = match method {
        "POST" => HttpMethod::POST,
        _ => HttpMethod::GET,
    };
    let mut context = AuthContext::new_with_method(user, password, uri, Option::<&[u8]>::None, method);
    if let Some(cnonce) = cnonce {
        context.set_custom_cnonce(cnonce);
    }

    let answer = prompt
        .respond(&context)
        .map_err(|e| DriverError::protocol("digest", e))?;
    Ok(answer.to_header_string())
}
