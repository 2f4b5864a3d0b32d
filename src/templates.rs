//! Built-in template texts.
//!
//! Only generic plumbing lives here: dataset sourcing, conditions
//! loading, the run-script skeleton, the grid descriptor and the
//! merge/plot scaffolding. Detector-specific analyzer parameter blocks
//! are supplied by the deployment, not this crate.

/// Conditions block loading the alignment's global tag.
pub const LOAD_GLOBAL_TAG_TEMPLATE: &str = "\
process.load(\"Configuration.StandardSequences.FrontierConditions_GlobalTag_cff\")
process.GlobalTag.globaltag = \".oO[GlobalTag]Oo.\"
";

/// Configuration skeleton for dataset-backed validations.
pub const DATASET_CFG_TEMPLATE: &str = "\
import FWCore.ParameterSet.Config as cms
import FWCore.PythonUtilities.LumiList as LumiList

process = cms.Process(\"validation\")

.oO[datasetDefinition]Oo.

process.maxEvents = cms.untracked.PSet(
    input = cms.untracked.int32(.oO[maxevents]Oo.)
)

process.load(\"Configuration.Geometry.GeometryRecoDB_cff\")
process.load(\"Configuration.StandardSequences..oO[magneticField]Oo._cff\")
.oO[condLoad]Oo.
.oO[validationBody]Oo.
process.TFileService = cms.Service(\"TFileService\",
    fileName = cms.string(\".oO[outputFile]Oo.\")
)
";

/// Configuration skeleton for geometry comparisons (no dataset).
pub const COMPARE_CFG_TEMPLATE: &str = "\
import FWCore.ParameterSet.Config as cms

process = cms.Process(\"validation\")
process.source = cms.Source(\"EmptySource\")
process.maxEvents = cms.untracked.PSet(input = cms.untracked.int32(1))

process.load(\"Configuration.Geometry.GeometryRecoDB_cff\")
.oO[condLoad]Oo.
.oO[validationBody]Oo.
";

/// Run-script skeleton shared by every validation kind.
pub const SCRIPT_TEMPLATE: &str = "\
#!/bin/bash
#init
export STAGE_SAS_TIMEOUT=120
source /afs/cern.ch/cms/caf/setup.sh
cd .oO[CMSSW_BASE]Oo./src
export SCRAM_ARCH=.oO[SCRAM_ARCH]Oo.
eval `scramv1 ru -sh`
rfmkdir -p .oO[workdir]Oo.
rm -f .oO[workdir]Oo./*
cd .oO[workdir]Oo.

#run
.oO[CommandLine]Oo.

#retrieve
rfmkdir -p .oO[logdir]Oo.
gzip -f LOGFILE_*_.oO[name]Oo..log
find .oO[workdir]Oo. -maxdepth 1 -name \"LOGFILE*.oO[alignmentName]Oo.*\" -print | xargs -I {} bash -c \"cp {} .oO[logdir]Oo.\"

#cleanup
rm -rf .oO[workdir]Oo.
echo \"done.\"
";

/// Per-configuration command block inserted into the run script.
pub const COMMAND_LINE_TEMPLATE: &str = "\
#run configfile and post-process it
cmsRun .oO[cfgFile]Oo.
.oO[postProcess]Oo.
";

/// Grid-submission descriptor.
pub const CRAB_CFG_TEMPLATE: &str = "\
[CRAB]
jobtype = cmssw
scheduler = caf
use_server = 0

[CAF]
queue = .oO[queue]Oo.

[USER]
return_data = 0
copy_data = 1
storage_element = T2_CH_CERN
user_remote_dir = .oO[eosdir]Oo.
ui_working_dir = .oO[crabWorkingDir]Oo.
script_exe = .oO[script]Oo.

[CMSSW]
pset = .oO[cfgFile]Oo.
datasetpath = .oO[dataset]Oo.
total_number_of_.oO[McOrData]Oo.
number_of_jobs = .oO[numberOfJobs]Oo.
output_file = .oO[outputFile]Oo.
";

/// Opening lines of the combined merge script.
pub const MERGE_HEADER_TEMPLATE: &str = "\
#!/bin/bash
#init merge step
cd .oO[CMSSW_BASE]Oo./src
export SCRAM_ARCH=.oO[SCRAM_ARCH]Oo.
eval `scramv1 ru -sh`
cd .oO[workdir]Oo.
mergeRetCode=0
";

/// Epilogue appended to every per-validation merge fragment: copy the
/// final output on success and keep the worst exit code seen so far.
pub const MERGE_EPILOGUE: &str = "\
if [[ tmpMergeRetCode -eq 0 ]]; then
  xrdcp -f .oO[finalOutputFile]Oo. root://eoscms//eos/cms.oO[finalResultFile]Oo.
fi
if [[ ${tmpMergeRetCode} -gt ${mergeRetCode} ]]; then
  mergeRetCode=${tmpMergeRetCode}
fi
";

/// Closing lines of the combined merge script.
pub const MERGE_FOOTER: &str = "\
exit ${mergeRetCode}
";

/// Shared plotting macro, rendered once per validation kind.
pub const PLOTTING_MACRO_TEMPLATE: &str = "\
void .oO[plottingMacroName]Oo.()
{
  gStyle->SetOptStat(0);
.oO[PlottingInstantiation]Oo.
  plot(\".oO[datadir]Oo.\", \".oO[eosdir]Oo.\");
}
";
