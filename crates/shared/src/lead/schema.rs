use std::str::FromStr;

use serde_json::Value;

use super::dispatcher::DispatchMode;

pub const DEFAULT_MARKER_KEY: &str = "collected_data";

/// One field the assistant is asked to collect.
///
/// Identity fields are always treated as required; a record that lacks one
/// of them is never complete, no matter what the `required` flag says.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadField {
    pub name: String,
    pub label: String,
    pub required: bool,
    pub identity: bool,
}

impl LeadField {
    pub fn identity(name: &str, label: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            required: true,
            identity: true,
        }
    }

    pub fn required(name: &str, label: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            required: true,
            identity: false,
        }
    }

    pub fn optional(name: &str, label: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            required: false,
            identity: false,
        }
    }

    pub fn is_mandatory(&self) -> bool {
        self.required || self.identity
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadSchema {
    pub marker_key: String,
    pub fields: Vec<LeadField>,
}

impl LeadSchema {
    pub fn new(marker_key: impl Into<String>, fields: Vec<LeadField>) -> Self {
        Self {
            marker_key: marker_key.into(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&LeadField> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.name.as_str())
    }

    /// Example structured block with placeholder values, as the provider is
    /// expected to emit it. Fields appear in schema order.
    pub fn example_block(&self) -> String {
        let entries = self
            .fields
            .iter()
            .map(|field| {
                format!(
                    "    {}: {}",
                    json_string(&field.name),
                    json_string(&field.label)
                )
            })
            .collect::<Vec<_>>()
            .join(",\n");
        format!(
            "```json\n{{\n  {}: {{\n{entries}\n  }}\n}}\n```",
            json_string(&self.marker_key)
        )
    }
}

fn json_string(raw: &str) -> String {
    Value::String(raw.to_owned()).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeadProfile {
    LeadCapture,
    InterviewOnboarding,
}

impl LeadProfile {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LeadCapture => "lead_capture",
            Self::InterviewOnboarding => "interview_onboarding",
        }
    }

    pub fn schema(self) -> LeadSchema {
        match self {
            Self::LeadCapture => LeadSchema::new(
                DEFAULT_MARKER_KEY,
                vec![
                    LeadField::identity("name", "Full name"),
                    LeadField::identity("email", "Business email address"),
                    LeadField::optional("company", "Company name"),
                    LeadField::optional("use_case", "Automation need or use case"),
                ],
            ),
            Self::InterviewOnboarding => LeadSchema::new(
                DEFAULT_MARKER_KEY,
                vec![
                    LeadField::identity("name", "Full name"),
                    LeadField::identity("email", "Email address"),
                    LeadField::required("job_role", "Role they are interviewing for"),
                    LeadField::required("resume_url", "Uploaded resume URL"),
                ],
            ),
        }
    }

    pub const fn default_dispatch_mode(self) -> DispatchMode {
        match self {
            Self::LeadCapture => DispatchMode::FireAndForget,
            Self::InterviewOnboarding => DispatchMode::AwaitRedirect,
        }
    }

    pub fn default_preamble(self) -> String {
        let schema = self.schema();
        let (persona, goal) = match self {
            Self::LeadCapture => (
                "You are a warm, professional lead capture assistant for an AI automation consultancy.",
                "Greet the visitor briefly, answer short questions about the services, and steer back to collecting their details.",
            ),
            Self::InterviewOnboarding => (
                "You are an onboarding assistant that prepares candidates for a mock interview.",
                "Ask for the candidate's details and ask them to upload their resume with the attach button. \
                 A message of the form [User uploaded resume: <url>] means the resume is available at <url>.",
            ),
        };

        let field_lines = schema
            .fields
            .iter()
            .enumerate()
            .map(|(index, field)| format!("{}. {} (`{}`)", index + 1, field.label, field.name))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "{persona}\n{goal}\n\n\
             Collect the following information, one item at a time:\n{field_lines}\n\n\
             Rules:\n\
             - Ask for ONE piece of information at a time and keep the tone conversational.\n\
             - Do NOT output the JSON block until every item is known.\n\
             - As soon as you have the last item, reply with a short closing message and, at the VERY END \
             of the same reply, the collected data as a valid JSON block in exactly this format:\n\
             {example}\n",
            example = schema.example_block(),
        )
    }
}

impl FromStr for LeadProfile {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "lead_capture" | "lead" => Ok(Self::LeadCapture),
            "interview_onboarding" | "interview" => Ok(Self::InterviewOnboarding),
            _ => Err(format!(
                "LEAD_PROFILE must be one of lead_capture, interview_onboarding; got '{raw}'"
            )),
        }
    }
}
