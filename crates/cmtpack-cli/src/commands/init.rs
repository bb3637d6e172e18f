//! Initialize a new cmtpack project

use anyhow::{Context, Result};
use cmtpack_core::config::CONFIG_FILE;
use std::fs;
use std::path::Path;

const SAMPLE_SCHEMA: &str = r#"<entities>
  <entity name="account" displayname="Account" primaryidfield="accountid">
    <fields>
      <field displayname="Account" name="accountid" type="guid" primaryKey="true" />
      <field displayname="Account Name" name="name" type="string" />
    </fields>
  </entity>
  <entity name="contact" displayname="Contact" primaryidfield="contactid">
    <fields>
      <field displayname="Contact" name="contactid" type="guid" primaryKey="true" />
      <field displayname="Full Name" name="fullname" type="string" />
      <field displayname="Company Name" name="parentcustomerid" type="entityreference" lookupType="account|contact" />
      <field displayname="Owner" name="ownerid" type="owner" />
    </fields>
    <relationships>
      <relationship name="contact_account_favorites" manyToMany="true" isreflexive="false" relatedEntityName="contact_account_favorites" m2mTargetEntity="account" m2mTargetEntityPrimaryKey="accountid" />
    </relationships>
  </entity>
  <entity name="appointment" displayname="Appointment" primaryidfield="activityid">
    <fields>
      <field displayname="Appointment" name="activityid" type="guid" primaryKey="true" />
      <field displayname="Subject" name="subject" type="string" />
      <field displayname="Start Time" name="scheduledstart" type="datetime" />
      <field displayname="Required Attendees" name="requiredattendees" type="partylist" lookupType="contact|account" />
    </fields>
  </entity>
</entities>
"#;

const SAMPLE_TABLES: [(&str, &str); 5] = [
    ("account.csv", "accountid,name\nA-001,Contoso\nA-002,Fabrikam\n"),
    (
        "contact.csv",
        "contactid,fullname,parentcustomerid,parentcustomerid_entityreference,ownerid\n\
         C-001,Ada Lovelace,A-001,account,U-001\n\
         C-002,Grace Hopper,C-001,contact,\n",
    ),
    (
        "appointment.csv",
        "activityid,subject,scheduledstart\nAP-001,Kickoff,25.08.2020 11:30\n",
    ),
    (
        "partylist_appointment.csv",
        "activityid,entityField,partyid,partyid_entityreference,activitypointerrecordid\n\
         AP-001,requiredattendees,C-001,contact,\n\
         AP-001,requiredattendees,C-002,contact|account,P-002\n",
    ),
    (
        "m2m_contact_account_favorites.csv",
        "contactid,accountid\nC-001,A-001\nC-001,A-002\nC-002,A-002\n",
    ),
];

/// Run the init command
pub fn run(path: &str, name: Option<&str>) -> Result<()> {
    let project_dir = Path::new(path);

    // Create directory if it doesn't exist
    if !project_dir.exists() {
        fs::create_dir_all(project_dir)
            .with_context(|| format!("Failed to create {}", project_dir.display()))?;
    }

    let abs_path = project_dir.canonicalize()?;

    // Derive project name from directory name if not provided
    let project_name = match name {
        Some(n) => n.to_string(),
        None => abs_path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("Could not determine project name from path"))?,
    };

    if project_dir.join(CONFIG_FILE).exists() {
        anyhow::bail!(
            "Directory '{}' already contains a {}",
            project_dir.display(),
            CONFIG_FILE
        );
    }

    tracing::info!("Creating new cmtpack project: {}", project_name);

    let config = format!(
        r#"# cmtpack Project Configuration
name: {project_name}

schema: data_schema.xml
tables_dir: tables
output_dir: output
data_file: data.xml
archive_file: data.zip

# Column selection per table. Leave empty to keep every table and column.
#   contact: []                    all columns
#   account: [name, accountid]     only these (primary key is always kept)
#   appointment: ["-description"]  all except these
columns: {{}}
"#
    );
    fs::write(project_dir.join(CONFIG_FILE), config)?;
    fs::write(project_dir.join("data_schema.xml"), SAMPLE_SCHEMA)?;

    let tables_dir = project_dir.join("tables");
    fs::create_dir_all(&tables_dir)?;
    for (file, contents) in SAMPLE_TABLES {
        fs::write(tables_dir.join(file), contents)?;
    }

    let gitignore = r#"# cmtpack output
output/

# IDE
.idea/
.vscode/
*.swp
"#;
    fs::write(project_dir.join(".gitignore"), gitignore)?;

    tracing::info!(
        "✓ Created project '{}' at {}",
        project_name,
        abs_path.display()
    );
    tracing::info!("");
    tracing::info!("Next steps:");
    if path != "." {
        tracing::info!("  cd {}", project_dir.display());
    }
    tracing::info!("  cmtpack tables      # Inspect loaded tables");
    tracing::info!("  cmtpack convert     # Build output/data.zip");

    Ok(())
}
