//! Closed sets of output groups, metric identifiers, components and dimensions

use std::fmt;

/// Shape of a metric output
///
/// The aggregator keeps one independent accumulation per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OutputGroup {
    /// One real score per metric and component
    DoubleScore,
    /// One duration score per metric and component
    DurationScore,
    /// Named vectors, e.g. diagram coordinates
    MultiVector,
    /// A two-dimensional matrix, e.g. a contingency table
    Matrix,
    /// Box plot quantiles per domain value
    BoxPlot,
    /// Time-indexed pairs, e.g. timing errors
    Paired,
}

impl OutputGroup {
    /// Every group, in order
    pub const ALL: [OutputGroup; 6] = [
        OutputGroup::DoubleScore,
        OutputGroup::DurationScore,
        OutputGroup::MultiVector,
        OutputGroup::Matrix,
        OutputGroup::BoxPlot,
        OutputGroup::Paired,
    ];

    /// Stable upper-case name, also used as a metrics label
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputGroup::DoubleScore => "DOUBLE_SCORE",
            OutputGroup::DurationScore => "DURATION_SCORE",
            OutputGroup::MultiVector => "MULTI_VECTOR",
            OutputGroup::Matrix => "MATRIX",
            OutputGroup::BoxPlot => "BOX_PLOT",
            OutputGroup::Paired => "PAIRED",
        }
    }
}

impl fmt::Display for OutputGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! named_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $( $(#[$vmeta:meta])* $variant:ident => $label:literal ),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Stable upper-case name
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $label ),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

named_enum! {
    /// Verification metric
    MetricId {
        /// Bias fraction
        BiasFraction => "BIAS_FRACTION",
        /// Brier score
        BrierScore => "BRIER_SCORE",
        /// Brier skill score
        BrierSkillScore => "BRIER_SKILL_SCORE",
        /// Box plot of errors by observed value
        BoxPlotOfErrorsByObservedValue => "BOX_PLOT_OF_ERRORS_BY_OBSERVED_VALUE",
        /// Box plot of errors by forecast value
        BoxPlotOfErrorsByForecastValue => "BOX_PLOT_OF_ERRORS_BY_FORECAST_VALUE",
        /// Coefficient of determination
        CoefficientOfDetermination => "COEFFICIENT_OF_DETERMINATION",
        /// Continuous ranked probability score
        ContinuousRankedProbabilityScore => "CONTINUOUS_RANKED_PROBABILITY_SCORE",
        /// Continuous ranked probability skill score
        ContinuousRankedProbabilitySkillScore => "CONTINUOUS_RANKED_PROBABILITY_SKILL_SCORE",
        /// Contingency table
        ContingencyTable => "CONTINGENCY_TABLE",
        /// Pearson correlation coefficient
        PearsonCorrelationCoefficient => "PEARSON_CORRELATION_COEFFICIENT",
        /// Threat score
        ThreatScore => "THREAT_SCORE",
        /// Equitable threat score
        EquitableThreatScore => "EQUITABLE_THREAT_SCORE",
        /// Frequency bias
        FrequencyBias => "FREQUENCY_BIAS",
        /// Index of agreement
        IndexOfAgreement => "INDEX_OF_AGREEMENT",
        /// Kling-Gupta efficiency
        KlingGuptaEfficiency => "KLING_GUPTA_EFFICIENCY",
        /// Mean absolute error
        MeanAbsoluteError => "MEAN_ABSOLUTE_ERROR",
        /// Mean error
        MeanError => "MEAN_ERROR",
        /// Mean square error
        MeanSquareError => "MEAN_SQUARE_ERROR",
        /// Mean square error skill score
        MeanSquareErrorSkillScore => "MEAN_SQUARE_ERROR_SKILL_SCORE",
        /// Peirce skill score
        PeirceSkillScore => "PEIRCE_SKILL_SCORE",
        /// Probability of detection
        ProbabilityOfDetection => "PROBABILITY_OF_DETECTION",
        /// Probability of false detection
        ProbabilityOfFalseDetection => "PROBABILITY_OF_FALSE_DETECTION",
        /// Quantile-quantile diagram
        QuantileQuantileDiagram => "QUANTILE_QUANTILE_DIAGRAM",
        /// Rank histogram
        RankHistogram => "RANK_HISTOGRAM",
        /// Relative operating characteristic diagram
        RelativeOperatingCharacteristicDiagram => "RELATIVE_OPERATING_CHARACTERISTIC_DIAGRAM",
        /// Relative operating characteristic score
        RelativeOperatingCharacteristicScore => "RELATIVE_OPERATING_CHARACTERISTIC_SCORE",
        /// Reliability diagram
        ReliabilityDiagram => "RELIABILITY_DIAGRAM",
        /// Root mean square error
        RootMeanSquareError => "ROOT_MEAN_SQUARE_ERROR",
        /// Sample size
        SampleSize => "SAMPLE_SIZE",
        /// Sum of square error
        SumOfSquareError => "SUM_OF_SQUARE_ERROR",
        /// Volumetric efficiency
        VolumetricEfficiency => "VOLUMETRIC_EFFICIENCY",
        /// Time-to-peak error per issuance
        TimeToPeakError => "TIME_TO_PEAK_ERROR",
        /// Summary statistic of the time-to-peak error
        TimeToPeakErrorStatistic => "TIME_TO_PEAK_ERROR_STATISTIC",
        /// Relative time-to-peak error per issuance
        TimeToPeakRelativeError => "TIME_TO_PEAK_RELATIVE_ERROR",
        /// Summary statistic of the relative time-to-peak error
        TimeToPeakRelativeErrorStatistic => "TIME_TO_PEAK_RELATIVE_ERROR_STATISTIC",
    }
}

impl MetricId {
    /// Output group the metric produces
    pub fn output_group(&self) -> OutputGroup {
        use MetricId::*;
        match self {
            BoxPlotOfErrorsByObservedValue | BoxPlotOfErrorsByForecastValue => OutputGroup::BoxPlot,
            ContingencyTable => OutputGroup::Matrix,
            QuantileQuantileDiagram
            | RankHistogram
            | RelativeOperatingCharacteristicDiagram
            | ReliabilityDiagram => OutputGroup::MultiVector,
            TimeToPeakError | TimeToPeakRelativeError => OutputGroup::Paired,
            TimeToPeakErrorStatistic | TimeToPeakRelativeErrorStatistic => OutputGroup::DurationScore,
            _ => OutputGroup::DoubleScore,
        }
    }
}

named_enum! {
    /// Component of a decomposed score or summary statistic
    MetricComponent {
        /// Main score
        Main => "MAIN",
        /// Reliability term
        Reliability => "RELIABILITY",
        /// Resolution term
        Resolution => "RESOLUTION",
        /// Uncertainty term
        Uncertainty => "UNCERTAINTY",
        /// Potential score
        Potential => "POTENTIAL",
        /// Type-II conditional bias
        TypeIiConditionalBias => "TYPE_II_CONDITIONAL_BIAS",
        /// Discrimination term
        Discrimination => "DISCRIMINATION",
        /// Sharpness term
        Sharpness => "SHARPNESS",
        /// Mean
        Mean => "MEAN",
        /// Median
        Median => "MEDIAN",
        /// Standard deviation
        StandardDeviation => "STANDARD_DEVIATION",
        /// Minimum
        Minimum => "MINIMUM",
        /// Maximum
        Maximum => "MAXIMUM",
        /// Mean absolute value
        MeanAbsolute => "MEAN_ABSOLUTE",
    }
}

named_enum! {
    /// Named axis of a vector, matrix or box plot output
    MetricDimension {
        /// Probability of false detection
        ProbabilityOfFalseDetection => "PROBABILITY_OF_FALSE_DETECTION",
        /// Probability of detection
        ProbabilityOfDetection => "PROBABILITY_OF_DETECTION",
        /// Rank order
        RankOrder => "RANK_ORDER",
        /// Forecast probability
        ForecastProbability => "FORECAST_PROBABILITY",
        /// Observed relative frequency
        ObservedRelativeFrequency => "OBSERVED_RELATIVE_FREQUENCY",
        /// Observed quantiles
        ObservedQuantiles => "OBSERVED_QUANTILES",
        /// Predicted quantiles
        PredictedQuantiles => "PREDICTED_QUANTILES",
        /// Forecast error
        ForecastError => "FORECAST_ERROR",
        /// Observed value
        ObservedValue => "OBSERVED_VALUE",
        /// Forecast value
        ForecastValue => "FORECAST_VALUE",
        /// Ensemble mean
        EnsembleMean => "ENSEMBLE_MEAN",
        /// Ensemble median
        EnsembleMedian => "ENSEMBLE_MEDIAN",
        /// Sample size
        SampleSize => "SAMPLE_SIZE",
        /// True positives
        TruePositives => "TRUE_POSITIVES",
        /// False positives
        FalsePositives => "FALSE_POSITIVES",
        /// False negatives
        FalseNegatives => "FALSE_NEGATIVES",
        /// True negatives
        TrueNegatives => "TRUE_NEGATIVES",
    }
}
