//! Geographic (EPSG:4326) to ETRS89-extended / LAEA Europe (EPSG:3035).
//!
//! Ellipsoidal Lambert Azimuthal Equal Area on GRS80, following the
//! formulas in IOGP Guidance Note 7-2 (method code 9820). Output is
//! `(easting, northing)` in metres; distances within a few kilometres of
//! any point are preserved to well under a metre per kilometre, which is
//! what buffered counting needs.

use geo::{Coord, Geometry, MapCoords, Point};

use crate::models::Coordinates;

const GRS80_SEMI_MAJOR_AXIS: f64 = 6_378_137.0;
const GRS80_INVERSE_FLATTENING: f64 = 298.257_222_101;

const LAEA_EUROPE_LAT_ORIGIN_DEG: f64 = 52.0;
const LAEA_EUROPE_LON_ORIGIN_DEG: f64 = 10.0;
const LAEA_EUROPE_FALSE_EASTING: f64 = 4_321_000.0;
const LAEA_EUROPE_FALSE_NORTHING: f64 = 3_210_000.0;

#[derive(Debug, Clone, Copy)]
pub struct LaeaProjection {
    e: f64,
    e2: f64,
    lon0: f64,
    q_p: f64,
    r_q: f64,
    d: f64,
    sin_beta0: f64,
    cos_beta0: f64,
    false_easting: f64,
    false_northing: f64,
}

impl LaeaProjection {
    /// EPSG:3035 parameters.
    pub fn etrs89() -> Self {
        Self::new(
            GRS80_SEMI_MAJOR_AXIS,
            GRS80_INVERSE_FLATTENING,
            LAEA_EUROPE_LAT_ORIGIN_DEG,
            LAEA_EUROPE_LON_ORIGIN_DEG,
            LAEA_EUROPE_FALSE_EASTING,
            LAEA_EUROPE_FALSE_NORTHING,
        )
    }

    pub fn new(
        semi_major_axis: f64,
        inverse_flattening: f64,
        lat_origin_deg: f64,
        lon_origin_deg: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Self {
        let a = semi_major_axis;
        let f = 1.0 / inverse_flattening;
        let e2 = 2.0 * f - f * f;
        let e = e2.sqrt();

        let phi0 = lat_origin_deg.to_radians();
        let q_p = authalic_q(std::f64::consts::FRAC_PI_2.sin(), e, e2);
        let q0 = authalic_q(phi0.sin(), e, e2);
        let beta0 = (q0 / q_p).asin();
        let r_q = a * (q_p / 2.0).sqrt();
        let d = a * (phi0.cos() / (1.0 - e2 * phi0.sin().powi(2)).sqrt()) / (r_q * beta0.cos());

        LaeaProjection {
            e,
            e2,
            lon0: lon_origin_deg.to_radians(),
            q_p,
            r_q,
            d,
            sin_beta0: beta0.sin(),
            cos_beta0: beta0.cos(),
            false_easting,
            false_northing,
        }
    }

    /// Project a geographic coordinate (`x` = longitude, `y` = latitude,
    /// degrees) to `(easting, northing)` metres.
    pub fn project(&self, geographic: Coord<f64>) -> Coord<f64> {
        let phi = geographic.y.to_radians();
        let dlon = geographic.x.to_radians() - self.lon0;

        let q = authalic_q(phi.sin(), self.e, self.e2);
        // Clamp guards the poles, where rounding can push |q/qP| past 1.
        let beta = (q / self.q_p).clamp(-1.0, 1.0).asin();
        let (sin_beta, cos_beta) = beta.sin_cos();

        let b = self.r_q
            * (2.0 / (1.0 + self.sin_beta0 * sin_beta + self.cos_beta0 * cos_beta * dlon.cos()))
                .sqrt();

        Coord {
            x: self.false_easting + b * self.d * cos_beta * dlon.sin(),
            y: self.false_northing
                + (b / self.d)
                    * (self.cos_beta0 * sin_beta - self.sin_beta0 * cos_beta * dlon.cos()),
        }
    }

    pub fn project_coordinates(&self, c: &Coordinates) -> Coord<f64> {
        self.project(Point::from(*c).into())
    }

    /// Reproject every vertex of a geographic geometry.
    pub fn project_geometry(&self, geometry: &Geometry<f64>) -> Geometry<f64> {
        let projection = *self;
        geometry.map_coords(move |c| projection.project(c))
    }
}

fn authalic_q(sin_phi: f64, e: f64, e2: f64) -> f64 {
    let e_sin = e * sin_phi;
    (1.0 - e2)
        * (sin_phi / (1.0 - e2 * sin_phi * sin_phi)
            - (1.0 / (2.0 * e)) * ((1.0 - e_sin) / (1.0 + e_sin)).ln())
}
