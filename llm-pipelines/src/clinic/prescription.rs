//! Prescription PDF generation via `printpdf`

use super::types::{ClinicError, ClinicalRecord};
use crate::research::render::to_latin1;
use chrono::Local;
use printpdf::*;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const BOTTOM_MARGIN: f32 = 25.0;

pub struct PrescriptionWriter {
    dir: PathBuf,
}

impl PrescriptionWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `{Patient_Name}_{YYYYmmdd_HHMMSS}.pdf`
    ///
    /// Anything other than letters, digits and `-` in the name becomes `_`.
    pub fn file_name(record: &ClinicalRecord) -> String {
        let name: String = record
            .patient
            .name
            .trim()
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        format!(
            "{}_{}.pdf",
            name,
            Local::now().format("%Y%m%d_%H%M%S")
        )
    }

    /// Writes the prescription for `record` and returns the file path.
    pub fn write(&self, record: &ClinicalRecord) -> Result<PathBuf, ClinicError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(Self::file_name(record));

        let (doc, page1, layer1) =
            PdfDocument::new("MEDICAL PRESCRIPTION", Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ClinicError::Pdf(format!("font error: {e}")))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ClinicError::Pdf(format!("font error: {e}")))?;

        let mut layer = doc.get_page(page1).get_layer(layer1);
        let mut y = Mm(275.0);

        layer.use_text("MEDICAL PRESCRIPTION", 20.0, Mm(55.0), y, &bold);
        y -= Mm(12.0);
        layer.use_text(
            format!("Date: {}", Local::now().format("%B %d, %Y")),
            10.0,
            Mm(20.0),
            y,
            &font,
        );
        y -= Mm(12.0);

        layer.use_text("Patient Information", 13.0, Mm(20.0), y, &bold);
        y -= Mm(7.0);
        for (label, value) in [
            ("Name:", record.patient.name.clone()),
            ("Age:", record.patient.age.to_string()),
            ("Diagnosis:", record.diagnosis.clone()),
        ] {
            layer.use_text(label, 11.0, Mm(20.0), y, &bold);
            layer.use_text(to_latin1(&value), 11.0, Mm(50.0), y, &font);
            y -= Mm(6.0);
        }
        y -= Mm(6.0);

        layer.use_text("Prescription", 13.0, Mm(20.0), y, &bold);
        y -= Mm(7.0);
        if record.prescription.is_empty() {
            layer.use_text("No prescription items", 10.0, Mm(20.0), y, &font);
            y -= Mm(6.0);
        } else {
            for (column, x) in [("Medication", 20.0), ("Dosage", 80.0), ("Frequency", 115.0), ("Duration", 155.0)] {
                layer.use_text(column, 10.0, Mm(x), y, &bold);
            }
            y -= Mm(6.0);
            for item in &record.prescription {
                if y.0 < BOTTOM_MARGIN {
                    let (page, new_layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
                    layer = doc.get_page(page).get_layer(new_layer);
                    y = Mm(275.0);
                }
                for (text, x) in [
                    (&item.medication, 20.0),
                    (&item.dosage, 80.0),
                    (&item.frequency, 115.0),
                    (&item.duration, 155.0),
                ] {
                    layer.use_text(to_latin1(text), 10.0, Mm(x), y, &font);
                }
                y -= Mm(6.0);
            }
        }
        y -= Mm(6.0);

        if !record.followup.trim().is_empty() && y.0 > BOTTOM_MARGIN + 20.0 {
            layer.use_text("Follow-up", 13.0, Mm(20.0), y, &bold);
            y -= Mm(7.0);
            let line = to_latin1(&format!("Next appointment: {}", record.followup));
            layer.use_text(line, 10.0, Mm(20.0), y, &font);
        }

        layer.use_text("This is a computer-generated prescription.", 8.0, Mm(70.0), Mm(20.0), &font);
        layer.use_text(
            "Please consult your doctor for any clarifications.",
            8.0,
            Mm(66.0),
            Mm(16.0),
            &font,
        );

        let file = File::create(&path)?;
        doc.save(&mut BufWriter::new(file))
            .map_err(|e| ClinicError::Pdf(format!("save error: {e}")))?;

        tracing::info!(path = %path.display(), "prescription PDF generated");
        Ok(path)
    }
}
