// # Export Settings
//
// Where the host writes review movies and which export preset it uses. The
// default implementation generates a QuickTime codec profile and a movie export
// preset referencing it, cached per menu name.

use crate::config::Config;
use crate::review::error::ReviewError;
use std::path::{Path, PathBuf};
use tracing::debug;

const CODEC_PROFILE_FILE: &str = "quicktime_settings.cdxprof";
const EXPORT_PRESET_FILE: &str = "export_preset.xml";
const CODEC_PROFILE_PLACEHOLDER: &str = "{CODEC_PROFILE_PATH}";

const CODEC_PROFILE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<codecprofile version="1.0">
   <format name="QuickTime">
      <essence name="video">
         <provider name="libquicktime">
            <codec name="H264E" longname="H264" type="video" description="Main Concept H264 Codec">
               <params presetName="High_1080i_6Mbits">
                  <param name="Target preset" internalname="target_preset" type="enum" value="H264_HIGH" />
                  <param name="GOP size" internalname="idr_interval" type="int" min="1" max="300" value="33" />
                  <param name="B-Frames" internalname="numBframes" type="int" min="0" max="3" value="2" />
                  <param name="Adaptive B-frame decision" internalname="adaptive_b_frames" type="bool" value="1" />
                  <param name="Automatic scene detection" internalname="vcsd_mode" type="bool" value="1" />
                  <param name="Rate control method" internalname="bit_rate_mode" type="enum" value="Average bitrate" />
                  <param name="Bitrate" internalname="bit_rate" type="int" min="1" max="1000000" value="6000" />
                  <param name="Max bitrate" internalname="max_bit_rate" type="int" min="1" max="1000000" value="8000" />
                  <param name="Minimum quantizer" internalname="min_quant" type="int" min="1" max="51" value="0" />
                  <param name="Maximum quantizer" internalname="max_quant" type="int" min="1" max="51" value="51" />
                  <param name="Optimize rate-distortion cost" internalname="rd_optimization" type="bool" value="1" />
               </params>
            </codec>
         </provider>
      </essence>
   </format>
</codecprofile>
"#;

const EXPORT_PRESET_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<preset version="4">
   <type>movie</type>
   <comment>Creates an 8-bit QuickTime file (H.264 1280x720 8Mbits).</comment>
   <movie>
      <fileType>QuickTime</fileType>
      <namePattern></namePattern>
      <yuvHeadroom>False</yuvHeadroom>
      <yuvColourSpace>PCS_UNKNOWN</yuvColourSpace>
   </movie>
   <video>
      <fileType>QuickTime</fileType>
      <codec>33622016</codec>
      <codecProfile>{CODEC_PROFILE_PATH}</codecProfile>
      <namePattern></namePattern>
      <compressionQuality>50</compressionQuality>
      <publishLinked>False</publishLinked>
      <foregroundPublish>False</foregroundPublish>
      <overwriteWithVersions>False</overwriteWithVersions>
      <resize>
         <resizeType>fit</resizeType>
         <resizeFilter>lanczos</resizeFilter>
         <width>1280</width>
         <height>720</height>
         <bitsPerChannel>8</bitsPerChannel>
         <numChannels>3</numChannels>
         <floatingPoint>False</floatingPoint>
         <pixelRatio>1</pixelRatio>
         <scanFormat>P</scanFormat>
      </resize>
   </video>
   <audio>
      <fileType>QuickTime</fileType>
      <codec>4026793986</codec>
      <mixdown>AsIs</mixdown>
      <sampleRate>48000</sampleRate>
      <bitRate>128</bitRate>
      <bitDepth>-1</bitDepth>
   </audio>
   <name>
      <framePadding>8</framePadding>
      <startFrame>0</startFrame>
      <useTimecode>False</useTimecode>
   </name>
</preset>
"#;

/// Export destination and preset for a session
pub trait ExportSettings: Send + Sync {
    fn destination_host(&self) -> String;

    /// Temporary folder for movies awaiting upload
    fn target_location(&self) -> PathBuf;

    /// Path of the export preset document the host should use
    fn export_preset(&self) -> Result<PathBuf, ReviewError>;
}

/// Writes the bundled preset documents under the cache location
#[derive(Debug, Clone)]
pub struct GeneratedPresetSettings {
    preset_dir: PathBuf,
    target_location: PathBuf,
    destination_host: String,
}

impl GeneratedPresetSettings {
    pub fn new(config: &Config) -> Self {
        Self {
            preset_dir: config.cache_location.join(&config.menu_name),
            target_location: config.target_location.clone(),
            destination_host: config.destination_host.clone(),
        }
    }

    fn write_file(&self, file_name: &str, content: &str) -> Result<PathBuf, ReviewError> {
        std::fs::create_dir_all(&self.preset_dir)?;
        let path = self.preset_dir.join(file_name);
        std::fs::write(&path, content)?;
        debug!("Wrote preset file {}", path.display());
        Ok(path)
    }
}

fn render_export_preset(codec_profile: &Path) -> String {
    EXPORT_PRESET_XML.replace(
        CODEC_PROFILE_PLACEHOLDER,
        &codec_profile.display().to_string(),
    )
}

impl ExportSettings for GeneratedPresetSettings {
    fn destination_host(&self) -> String {
        self.destination_host.clone()
    }

    fn target_location(&self) -> PathBuf {
        self.target_location.clone()
    }

    fn export_preset(&self) -> Result<PathBuf, ReviewError> {
        let codec_profile = self.write_file(CODEC_PROFILE_FILE, CODEC_PROFILE_XML)?;
        self.write_file(EXPORT_PRESET_FILE, &render_export_preset(&codec_profile))
    }
}
