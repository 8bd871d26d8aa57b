//! Test doubles shared across unit tests: a scripted LLM client and a
//! configurable tool.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::llm::{ChatMessage, ChatOptions, ChatResponse, FunctionCall, LlmClient, ToolCall, ToolDefinition};
use crate::tools::{Tool, ToolOutput};

enum Scripted {
    Answer { text: String, delay: Option<Duration> },
    ToolCall { name: String, args: Value },
}

/// Scripted LLM client: pops one response per call, in order. An empty
/// script makes the next call fail, which stands in for a provider outage.
pub struct MockLlm {
    script: Mutex<VecDeque<Scripted>>,
    /// When set, an exhausted script keeps producing this tool call.
    looping_call: Option<(String, Value)>,
}

impl MockLlm {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            looping_call: None,
        }
    }

    /// A client that answers each call with the next text in `answers`.
    pub fn answering(answers: &[&str]) -> Self {
        let mock = Self::new();
        {
            let mut script = mock.script.lock().unwrap();
            for text in answers {
                script.push_back(Scripted::Answer {
                    text: text.to_string(),
                    delay: None,
                });
            }
        }
        mock
    }

    /// A client that decides the same tool call on every turn, forever.
    pub fn looping_tool_call(name: &str, args: Value) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            looping_call: Some((name.to_string(), args)),
        }
    }

    pub fn then_answer(self, text: &str) -> Self {
        self.script.lock().unwrap().push_back(Scripted::Answer {
            text: text.to_string(),
            delay: None,
        });
        self
    }

    pub fn then_answer_delayed(self, text: &str, delay: Duration) -> Self {
        self.script.lock().unwrap().push_back(Scripted::Answer {
            text: text.to_string(),
            delay: Some(delay),
        });
        self
    }

    pub fn then_tool_call(self, name: &str, args: Value) -> Self {
        self.script.lock().unwrap().push_back(Scripted::ToolCall {
            name: name.to_string(),
            args,
        });
        self
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn chat(
        &self,
        model: &str,
        _messages: &[ChatMessage],
        _tools: Option<&[ToolDefinition]>,
        _options: ChatOptions,
    ) -> anyhow::Result<ChatResponse> {
        let next = self.script.lock().unwrap().pop_front();
        let usage = json!({"usage": {"input_tokens": 10, "output_tokens": 5}});

        let (content, tool_calls) = match next {
            Some(Scripted::Answer { text, delay }) => {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                (Some(text), None)
            }
            Some(Scripted::ToolCall { name, args }) => (
                None,
                Some(vec![ToolCall {
                    id: format!("call-{name}"),
                    call_type: "function".to_string(),
                    function: FunctionCall {
                        name,
                        arguments: args.to_string(),
                    },
                }]),
            ),
            None => match &self.looping_call {
                Some((name, args)) => (
                    None,
                    Some(vec![ToolCall {
                        id: format!("call-{name}"),
                        call_type: "function".to_string(),
                        function: FunctionCall {
                            name: name.clone(),
                            arguments: args.to_string(),
                        },
                    }]),
                ),
                None => anyhow::bail!("mock script exhausted"),
            },
        };

        Ok(ChatResponse {
            content,
            tool_calls,
            finish_reason: Some("stop".to_string()),
            model: Some(model.to_string()),
            usage: Some(usage),
        })
    }
}

/// Configurable tool double.
pub struct MockTool {
    name: String,
    content: String,
    delay: Option<Duration>,
    fail: bool,
    usage_metadata: Option<Value>,
}

impl MockTool {
    pub fn new(name: &str, content: &str) -> Self {
        Self {
            name: name.to_string(),
            content: content.to_string(),
            delay: None,
            fail: false,
            usage_metadata: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn with_usage_metadata(mut self, metadata: Value) -> Self {
        self.usage_metadata = Some(metadata);
        self
    }
}

#[async_trait]
impl Tool for MockTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "mock tool"
    }

    async fn invoke(&self, _args: Value) -> anyhow::Result<ToolOutput> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            anyhow::bail!("simulated tool failure");
        }
        Ok(ToolOutput {
            content: self.content.clone(),
            usage_metadata: self.usage_metadata.clone(),
        })
    }
}
