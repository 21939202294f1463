use std::time::Duration;

use log::debug;
use reqwest::{Client, ClientBuilder, Method};
use serde_json::{Value, json};
use tokio::time::{Instant, sleep};

use crate::{
    error::{CrawlError, CrawlResult},
    page::{ElementId, POLL_INTERVAL, WindowId},
};

/// W3C web element identifier key.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    pub using: &'static str,
    pub value: String,
}

impl Locator {
    pub fn css(value: impl Into<String>) -> Self {
        Self {
            using: "css selector",
            value: value.into(),
        }
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Self {
            using: "xpath",
            value: value.into(),
        }
    }

    fn body(&self) -> Value {
        json!({ "using": self.using, "value": self.value })
    }
}

/// One remote-controlled browser, spoken to over the WebDriver wire protocol.
pub struct WebDriverSession {
    client: Client,
    session_url: String,
}

impl WebDriverSession {
    pub async fn start(endpoint: &str, capabilities: Value) -> CrawlResult<Self> {
        let client = ClientBuilder::new().timeout(REQUEST_TIMEOUT).build()?;
        let endpoint = endpoint.trim_end_matches('/');
        let value = send(
            client
                .post(format!("{endpoint}/session"))
                .json(&json!({ "capabilities": capabilities })),
        )
        .await?;
        let Some(session_id) = value["sessionId"].as_str() else {
            return Err(CrawlError::WebDriver {
                error: "session not created".to_string(),
                message: format!("no sessionId in {value}"),
            });
        };
        debug!("WebDriver session {session_id} created");
        Ok(Self {
            session_url: format!("{endpoint}/session/{session_id}"),
            client,
        })
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> CrawlResult<Value> {
        let mut request = self
            .client
            .request(method, format!("{}{}", self.session_url, path));
        if let Some(body) = body {
            request = request.json(&body);
        }
        send(request).await
    }

    async fn post(&self, path: &str, body: Value) -> CrawlResult<Value> {
        self.command(Method::POST, path, Some(body)).await
    }

    async fn get(&self, path: &str) -> CrawlResult<Value> {
        self.command(Method::GET, path, None).await
    }

    async fn delete(&self, path: &str) -> CrawlResult<Value> {
        self.command(Method::DELETE, path, None).await
    }

    pub async fn navigate(&self, url: &str) -> CrawlResult<()> {
        self.post("/url", json!({ "url": url })).await?;
        Ok(())
    }

    /// Single lookup; `None` when nothing matches yet.
    pub async fn find_element(&self, locator: &Locator) -> CrawlResult<Option<ElementId>> {
        match self.post("/element", locator.body()).await {
            Ok(value) => Ok(element_id(&value)),
            Err(CrawlError::WebDriver { error, .. }) if error == "no such element" => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn find_elements(&self, locator: &Locator) -> CrawlResult<Vec<ElementId>> {
        let value = self.post("/elements", locator.body()).await?;
        Ok(element_ids(&value))
    }

    pub async fn find_elements_from(
        &self,
        parent: &ElementId,
        locator: &Locator,
    ) -> CrawlResult<Vec<ElementId>> {
        let value = self
            .post(&format!("/element/{}/elements", parent.0), locator.body())
            .await?;
        Ok(element_ids(&value))
    }

    pub async fn wait_for_element(
        &self,
        locator: &Locator,
        wait: Duration,
    ) -> CrawlResult<Option<ElementId>> {
        let deadline = Instant::now() + wait;
        loop {
            if let Some(element) = self.find_element(locator).await? {
                return Ok(Some(element));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    pub async fn wait_for_elements(
        &self,
        locator: &Locator,
        wait: Duration,
    ) -> CrawlResult<Vec<ElementId>> {
        let deadline = Instant::now() + wait;
        loop {
            let elements = self.find_elements(locator).await?;
            if !elements.is_empty() || Instant::now() >= deadline {
                return Ok(elements);
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// Clicks through script so overlays cannot intercept the click.
    pub async fn click(&self, element: &ElementId) -> CrawlResult<()> {
        self.post(
            "/execute/sync",
            json!({
                "script": "arguments[0].click();",
                "args": [{ ELEMENT_KEY: element.0 }],
            }),
        )
        .await?;
        Ok(())
    }

    pub async fn text(&self, element: &ElementId) -> CrawlResult<String> {
        let value = self.get(&format!("/element/{}/text", element.0)).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    pub async fn window(&self) -> CrawlResult<WindowId> {
        let value = self.get("/window").await?;
        Ok(WindowId(value.as_str().unwrap_or_default().to_string()))
    }

    pub async fn window_handles(&self) -> CrawlResult<Vec<WindowId>> {
        let value = self.get("/window/handles").await?;
        Ok(value
            .as_array()
            .map(|handles| {
                handles
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|handle| WindowId(handle.to_string()))
                    .collect()
            })
            .unwrap_or_default())
    }

    pub async fn switch_to_window(&self, window: &WindowId) -> CrawlResult<()> {
        self.post("/window", json!({ "handle": window.0 })).await?;
        Ok(())
    }

    pub async fn close_window(&self) -> CrawlResult<()> {
        self.delete("/window").await?;
        Ok(())
    }

    pub async fn delete_all_cookies(&self) -> CrawlResult<()> {
        self.delete("/cookie").await?;
        Ok(())
    }

    pub async fn quit(self) -> CrawlResult<()> {
        self.delete("").await?;
        Ok(())
    }
}

async fn send(request: reqwest::RequestBuilder) -> CrawlResult<Value> {
    let response = request.send().await?;
    let status = response.status();
    let mut payload: Value = response.json().await?;
    let value = payload
        .get_mut("value")
        .map(Value::take)
        .unwrap_or(Value::Null);
    if status.is_success() {
        return Ok(value);
    }
    Err(CrawlError::WebDriver {
        error: value["error"].as_str().unwrap_or("unknown error").to_string(),
        message: value["message"].as_str().unwrap_or_default().to_string(),
    })
}

fn element_id(value: &Value) -> Option<ElementId> {
    value[ELEMENT_KEY]
        .as_str()
        .map(|id| ElementId(id.to_string()))
}

fn element_ids(value: &Value) -> Vec<ElementId> {
    value
        .as_array()
        .map(|elements| elements.iter().filter_map(element_id).collect())
        .unwrap_or_default()
}
